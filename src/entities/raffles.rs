use crate::models::{PrizeType, RaffleStatus};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 抽奖申请实体。
/// 状态机: pending -> approved | rejected, 终态不可再变。
/// - request_number: 按提交者递增且唯一 (非全局)
/// - participant_count: 反范式参与人数, 恒等于参与记录行数
/// - version / original_data: 编辑版本号与逐版本快照 (JSON 数组, 最新在尾)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "raffles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submitter_id: i64,
    pub request_number: i64,
    /// 开奖消息所在频道 (@username)
    pub channel_name: String,
    pub message_id: i64,
    pub title: String,
    pub prize_type: PrizeType,
    pub prize_value: i64,
    /// 参与所需加入的频道列表 (JSON 数组)
    pub required_channels: Json,
    pub raffle_datetime: DateTime<Utc>,
    pub status: RaffleStatus,
    pub level_required: i32,
    pub reviewer_id: Option<i64>,
    pub rejection_reason: Option<String>,
    pub participant_count: i64,
    pub version: i32,
    pub original_data: Json,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.status == RaffleStatus::Pending
    }

    /// 开奖时间已过
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.raffle_datetime <= now
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

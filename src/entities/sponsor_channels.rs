use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 赞助频道配置实体 (运营侧维护, 本引擎只读)。
/// - channel_id: Telegram 频道标识 (@username 或 chat id), 唯一
/// - points_reward: 首次验证加入后发放的积分
/// - bot_has_access: 机器人能否读取该频道成员 (验证前置条件)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "sponsor_channels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub channel_id: String,
    pub title: String,
    pub points_reward: i64,
    pub is_special: bool,
    pub bot_has_access: bool,
    pub display_order: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 用户积分账本实体。
/// id 由身份子系统 (Telegram) 提供, 本引擎只通过积分发放操作修改
/// points / level; level 始终等于 floor(points / 1000) + 1。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub username: Option<String>,
    /// 累计积分, 单调不减
    pub points: i64,
    /// 由 points 推导的等级
    pub level: i32,
    /// 推荐码 (唯一, 首次生成后不变)
    pub referral_code: Option<String>,
    /// 注册时写入一次, 之后不变
    pub referrer_id: Option<i64>,
    pub submission_count: i32,
    /// 提交限制窗口截止时间
    pub restricted_until: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 是否处于提交限制窗口内
    pub fn is_restricted(&self, now: DateTime<Utc>) -> bool {
        matches!(self.restricted_until, Some(until) if until > now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

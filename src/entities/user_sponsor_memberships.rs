use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 用户-赞助频道成员状态。
/// (user_id, channel_id) 唯一, 首次检查时惰性创建。
/// points_earned 只增不减: 只有 is_member false->true 的转换才会增加,
/// 退出频道不回收 (earn and keep)。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user_sponsor_memberships")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub channel_id: i64,
    pub is_member: bool,
    pub points_earned: i64,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub last_checked: Option<DateTime<Utc>>,
    pub check_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use crate::entities::sponsor_channel_entity as sponsor_channels;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SponsorChannelResponse {
    pub id: i64,
    pub channel_id: String,
    pub title: String,
    pub points_reward: i64,
    pub is_special: bool,
    pub display_order: i32,
}

impl From<sponsor_channels::Model> for SponsorChannelResponse {
    fn from(m: sponsor_channels::Model) -> Self {
        Self {
            id: m.id,
            channel_id: m.channel_id,
            title: m.title,
            points_reward: m.points_reward,
            is_special: m.is_special,
            display_order: m.display_order,
        }
    }
}

/// 一次成员验证的结果。
/// points_awarded 仅在本次调用完成 false->true 转换时非零。
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckMembershipResponse {
    pub is_member: bool,
    /// 该频道累计已获得的积分 (只增)
    pub points_earned: i64,
    /// 本次调用新发放的积分
    pub points_awarded: i64,
    pub user_points: i64,
    pub user_level: i32,
}

use crate::entities::user_entity as users;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 身份子系统在用户首次打开小程序时调用 (见 user_service::create_user)。
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// 平台用户ID
    pub id: i64,
    #[schema(example = "alice")]
    pub username: Option<String>,
    /// 深链接里携带的推荐码
    #[schema(example = "K7KQ2M9D")]
    pub referrer_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: Option<String>,
    pub points: i64,
    pub level: i32,
    pub referral_code: Option<String>,
    pub submission_count: i32,
    pub total_referrals: i64,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            points: user.points,
            level: user.level,
            referral_code: user.referral_code,
            submission_count: user.submission_count,
            total_referrals: 0, // 需要单独查询
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReferralLinkResponse {
    pub referral_code: String,
    #[schema(example = "https://t.me/stargift_bot?start=K7KQ2M9D")]
    pub referral_link: String,
}

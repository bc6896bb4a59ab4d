use crate::entities::{referral_entity as referrals, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, UserResponse};
use crate::services::ReferralService;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
    referral_service: ReferralService,
}

impl UserService {
    pub fn new(pool: DatabaseConnection, referral_service: ReferralService) -> Self {
        Self {
            pool,
            referral_service,
        }
    }

    /// 身份子系统在用户首次进入时调用。
    /// 带推荐码时, 推荐关系注册与推荐人积分发放在同一事务里完成;
    /// referrer_id 只在创建时写入一次。
    pub async fn create_user(&self, req: CreateUserRequest) -> AppResult<UserResponse> {
        if req.id <= 0 {
            return Err(AppError::ValidationError(
                "User id must be positive".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;

        if users::Entity::find_by_id(req.id).one(&txn).await?.is_some() {
            return Err(AppError::AlreadyExists("User already exists".to_string()));
        }

        let now = Utc::now();
        let mut user = users::ActiveModel {
            id: Set(req.id),
            username: Set(req.username.clone()),
            points: Set(0),
            level: Set(1),
            submission_count: Set(0),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::already_exists_on_conflict(e, "User already exists"))?;

        if let Some(code) = req.referrer_code.as_deref()
            && let Some(referrer_id) = self
                .referral_service
                .register_referral_tx(&txn, code, req.id)
                .await?
        {
            let am = users::ActiveModel {
                id: Set(req.id),
                referrer_id: Set(Some(referrer_id)),
                updated_at: Set(Some(now)),
                ..Default::default()
            };
            user = am.update(&txn).await?;
        }

        txn.commit().await?;

        log::info!("User {} created (referrer: {:?})", user.id, user.referrer_id);
        Ok(UserResponse::from(user))
    }

    /// 个人资料: 积分/等级都是服务端算好的值, 前端只读
    pub async fn get_profile(&self, user_id: i64) -> AppResult<UserResponse> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let total_referrals = referrals::Entity::find()
            .filter(referrals::Column::ReferrerId.eq(user_id))
            .count(&self.pool)
            .await? as i64;

        let mut resp = UserResponse::from(user);
        resp.total_referrals = total_referrals;
        Ok(resp)
    }
}

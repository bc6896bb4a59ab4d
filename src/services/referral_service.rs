use crate::entities::{referral_entity as referrals, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::ReferralLinkResponse;
use crate::services::points_service::{self, AwardReason};
use crate::utils::generate_referral_code;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

const CODE_ALLOC_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct ReferralService {
    pool: DatabaseConnection,
    bot_username: String,
    referral_reward: i64,
}

impl ReferralService {
    pub fn new(pool: DatabaseConnection, bot_username: String, referral_reward: i64) -> Self {
        Self {
            pool,
            bot_username,
            referral_reward,
        }
    }

    /// 幂等获取推荐链接: 已有码直接返回, 没有则分配。
    /// 分配是条件写 (where referral_code is null), 并发请求只有一个
    /// 能写入; 码撞唯一索引时换码重试。
    pub async fn generate_referral_link(&self, user_id: i64) -> AppResult<ReferralLinkResponse> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if let Some(code) = user.referral_code {
            return Ok(self.link_for(code));
        }

        for _ in 0..CODE_ALLOC_ATTEMPTS {
            let code = generate_referral_code();
            let res = users::Entity::update_many()
                .col_expr(users::Column::ReferralCode, Expr::value(code.clone()))
                .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(users::Column::Id.eq(user_id))
                .filter(users::Column::ReferralCode.is_null())
                .exec(&self.pool)
                .await;
            match res {
                Ok(r) if r.rows_affected == 1 => return Ok(self.link_for(code)),
                Ok(_) => {
                    // 并发请求已经分配好了
                    let user = users::Entity::find_by_id(user_id)
                        .one(&self.pool)
                        .await?
                        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
                    let code = user.referral_code.ok_or_else(|| {
                        AppError::InternalError("Referral code missing after allocation".into())
                    })?;
                    return Ok(self.link_for(code));
                }
                // 生成的码已被别人占用, 换一个
                Err(e)
                    if matches!(
                        e.sql_err(),
                        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::InternalError(
            "Could not allocate a unique referral code".to_string(),
        ))
    }

    /// 注册推荐关系并给推荐人发放积分, 在调用方事务内执行。
    ///
    /// 静默条件 (返回 Ok(None), 不报错): 推荐码不存在、自荐。
    /// (referrer, referred) 已存在 -> AlreadyExists, 不发放。
    /// 返回 Some(referrer_id) 表示注册且发放成功。
    pub async fn register_referral_tx<C: ConnectionTrait>(
        &self,
        conn: &C,
        referrer_code: &str,
        new_user_id: i64,
    ) -> AppResult<Option<i64>> {
        let referrer = users::Entity::find()
            .filter(users::Column::ReferralCode.eq(referrer_code))
            .one(conn)
            .await?;
        let Some(referrer) = referrer else {
            log::info!("Ignoring unknown referral code for user {new_user_id}");
            return Ok(None);
        };
        if referrer.id == new_user_id {
            log::info!("Ignoring self-referral attempt by user {new_user_id}");
            return Ok(None);
        }

        referrals::ActiveModel {
            referrer_id: Set(referrer.id),
            referred_id: Set(new_user_id),
            points_earned: Set(self.referral_reward),
            created_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(|e| AppError::already_exists_on_conflict(e, "Referral already registered"))?;

        points_service::award_points(conn, referrer.id, self.referral_reward, AwardReason::Referral)
            .await?;

        Ok(Some(referrer.id))
    }

    /// 独立事务版本 (直接走 API 时用)
    pub async fn register_referral(
        &self,
        referrer_code: &str,
        new_user_id: i64,
    ) -> AppResult<Option<i64>> {
        let txn = self.pool.begin().await?;
        let out = self
            .register_referral_tx(&txn, referrer_code, new_user_id)
            .await?;
        txn.commit().await?;
        Ok(out)
    }

    fn link_for(&self, code: String) -> ReferralLinkResponse {
        ReferralLinkResponse {
            referral_link: format!("https://t.me/{}?start={}", self.bot_username, code),
            referral_code: code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{seed_user, setup_db};

    fn service(db: &DatabaseConnection) -> ReferralService {
        ReferralService::new(db.clone(), "stargift_bot".to_string(), 50)
    }

    #[tokio::test]
    async fn test_generate_referral_link_is_idempotent() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let service = service(&db);

        let first = service.generate_referral_link(1).await.unwrap();
        assert_eq!(first.referral_code.len(), 8);
        assert_eq!(
            first.referral_link,
            format!("https://t.me/stargift_bot?start={}", first.referral_code)
        );

        let second = service.generate_referral_link(1).await.unwrap();
        assert_eq!(first.referral_code, second.referral_code);
    }

    #[tokio::test]
    async fn test_register_referral_exactly_once() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        seed_user(&db, 2).await;
        let service = service(&db);
        let link = service.generate_referral_link(1).await.unwrap();

        let res = service
            .register_referral(&link.referral_code, 2)
            .await
            .unwrap();
        assert_eq!(res, Some(1));
        let referrer = users::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
        assert_eq!(referrer.points, 50);

        // 同一对重复注册: AlreadyExists 且零发放
        let err = service
            .register_referral(&link.referral_code, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
        let referrer = users::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
        assert_eq!(referrer.points, 50);
    }

    #[tokio::test]
    async fn test_register_referral_silent_no_ops() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let service = service(&db);
        let link = service.generate_referral_link(1).await.unwrap();

        // 未知推荐码: 静默
        assert_eq!(service.register_referral("ZZZZZZZZ", 1).await.unwrap(), None);
        // 自荐: 静默
        assert_eq!(
            service
                .register_referral(&link.referral_code, 1)
                .await
                .unwrap(),
            None
        );
        let user = users::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
        assert_eq!(user.points, 0);
    }

    #[tokio::test]
    async fn test_generate_link_unknown_user() {
        let db = setup_db().await;
        let service = service(&db);
        assert!(matches!(
            service.generate_referral_link(404).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}

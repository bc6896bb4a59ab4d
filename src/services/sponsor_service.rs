use crate::entities::{
    sponsor_channel_entity as sponsor_channels, user_entity as users,
    user_sponsor_membership_entity as memberships,
};
use crate::error::{AppError, AppResult};
use crate::external::MembershipProvider;
use crate::models::{CheckMembershipResponse, SponsorChannelResponse};
use crate::services::points_service::{self, AwardReason};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

/// 成员验证与奖励引擎。
///
/// 关键点: 外部验证调用 (provider) 在任何事务/锁之外进行, provider 慢
/// 不会阻塞无关操作; 之后的对账在一个事务里, false->true 转换是条件写
/// (where is_member = false), 并发重复检查最多一个能完成转换并发放积分,
/// 其余走"无变化"分支。
#[derive(Clone)]
pub struct SponsorService<P> {
    pool: DatabaseConnection,
    provider: P,
}

impl<P: MembershipProvider> SponsorService<P> {
    pub fn new(pool: DatabaseConnection, provider: P) -> Self {
        Self { pool, provider }
    }

    pub async fn list_channels(&self) -> AppResult<Vec<SponsorChannelResponse>> {
        let list = sponsor_channels::Entity::find()
            .order_by_asc(sponsor_channels::Column::DisplayOrder)
            .order_by_asc(sponsor_channels::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    /// 检查用户在某赞助频道的成员状态并对账。
    ///
    /// 1. bot 无权限 -> NotEligible, 不创建不修改任何行
    /// 2. 惰性创建成员状态行 (is_member = false)
    /// 3. 调 provider; 失败/超时 -> ProviderUnavailable, 存储状态不变
    /// 4. 事务内对账:
    ///    - false -> true: 条件写完成转换, 发放 points_reward (只此一次)
    ///    - true -> false: 标记退出, 已得积分保留 (earn and keep)
    ///    - 无变化: 只更新 check_count / last_checked
    pub async fn check_membership(
        &self,
        user_id: i64,
        channel_pk: i64,
    ) -> AppResult<CheckMembershipResponse> {
        let channel = sponsor_channels::Entity::find_by_id(channel_pk)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Sponsor channel not found".to_string()))?;
        if !channel.bot_has_access {
            return Err(AppError::NotEligible(
                "Bot has no access to this channel".to_string(),
            ));
        }

        users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.ensure_membership_row(user_id, channel_pk).await?;

        // 外部调用, 不持有任何锁; 失败时到此为止, 没有状态变更
        let observed = self.provider.is_member(user_id, &channel.channel_id).await?;

        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let member_filter = || {
            memberships::Entity::update_many()
                .filter(memberships::Column::UserId.eq(user_id))
                .filter(memberships::Column::ChannelId.eq(channel_pk))
        };

        let mut awarded = 0i64;
        if observed {
            // 条件写: 只有当前存的还是 false 才完成转换
            let res = member_filter()
                .col_expr(memberships::Column::IsMember, Expr::value(true))
                .col_expr(memberships::Column::JoinedAt, Expr::value(now))
                .col_expr(
                    memberships::Column::PointsEarned,
                    Expr::col(memberships::Column::PointsEarned).add(channel.points_reward),
                )
                .col_expr(
                    memberships::Column::CheckCount,
                    Expr::col(memberships::Column::CheckCount).add(1),
                )
                .col_expr(memberships::Column::LastChecked, Expr::value(now))
                .col_expr(memberships::Column::UpdatedAt, Expr::value(now))
                .filter(memberships::Column::IsMember.eq(false))
                .exec(&txn)
                .await?;
            if res.rows_affected == 1 {
                if channel.points_reward > 0 {
                    points_service::award_points(
                        &txn,
                        user_id,
                        channel.points_reward,
                        AwardReason::SponsorMembership,
                    )
                    .await?;
                }
                awarded = channel.points_reward;
            } else {
                // 已是成员 (或并发检查抢先完成转换): 无变化分支
                self.touch(&txn, user_id, channel_pk).await?;
            }
        } else {
            let res = member_filter()
                .col_expr(memberships::Column::IsMember, Expr::value(false))
                .col_expr(memberships::Column::LeftAt, Expr::value(now))
                .col_expr(
                    memberships::Column::CheckCount,
                    Expr::col(memberships::Column::CheckCount).add(1),
                )
                .col_expr(memberships::Column::LastChecked, Expr::value(now))
                .col_expr(memberships::Column::UpdatedAt, Expr::value(now))
                .filter(memberships::Column::IsMember.eq(true))
                .exec(&txn)
                .await?;
            if res.rows_affected == 0 {
                self.touch(&txn, user_id, channel_pk).await?;
            } else {
                log::info!("User {user_id} left sponsor channel {} ", channel.channel_id);
            }
        }

        let membership = memberships::Entity::find()
            .filter(memberships::Column::UserId.eq(user_id))
            .filter(memberships::Column::ChannelId.eq(channel_pk))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::InternalError("Membership row vanished during check".to_string())
            })?;
        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        txn.commit().await?;

        Ok(CheckMembershipResponse {
            is_member: membership.is_member,
            points_earned: membership.points_earned,
            points_awarded: awarded,
            user_points: user.points,
            user_level: user.level,
        })
    }

    /// 惰性创建 (user, channel) 状态行; 并发创建时输掉唯一索引竞争的
    /// 一方直接沿用已存在的行。
    async fn ensure_membership_row(&self, user_id: i64, channel_pk: i64) -> AppResult<()> {
        let existing = memberships::Entity::find()
            .filter(memberships::Column::UserId.eq(user_id))
            .filter(memberships::Column::ChannelId.eq(channel_pk))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Ok(());
        }
        let insert = memberships::ActiveModel {
            user_id: Set(user_id),
            channel_id: Set(channel_pk),
            is_member: Set(false),
            points_earned: Set(0),
            check_count: Set(0),
            created_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&self.pool)
        .await;
        match insert {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// "无变化"分支: 只记账 check_count / last_checked
    async fn touch<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        channel_pk: i64,
    ) -> AppResult<()> {
        let now = Utc::now();
        memberships::Entity::update_many()
            .col_expr(
                memberships::Column::CheckCount,
                Expr::col(memberships::Column::CheckCount).add(1),
            )
            .col_expr(memberships::Column::LastChecked, Expr::value(now))
            .col_expr(memberships::Column::UpdatedAt, Expr::value(now))
            .filter(memberships::Column::UserId.eq(user_id))
            .filter(memberships::Column::ChannelId.eq(channel_pk))
            .exec(conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{seed_channel, seed_user, setup_db};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// 可编程的假 provider: 固定应答 / 故障开关 / 可选延迟
    #[derive(Clone)]
    struct FakeProvider {
        member: Arc<AtomicBool>,
        unavailable: Arc<AtomicBool>,
        delay_ms: u64,
    }

    impl FakeProvider {
        fn reporting(member: bool) -> Self {
            Self {
                member: Arc::new(AtomicBool::new(member)),
                unavailable: Arc::new(AtomicBool::new(false)),
                delay_ms: 0,
            }
        }
    }

    impl MembershipProvider for FakeProvider {
        async fn is_member(&self, _user_id: i64, _channel_id: &str) -> AppResult<bool> {
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::ProviderUnavailable("provider down".to_string()));
            }
            Ok(self.member.load(Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn test_first_observed_membership_awards_once() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let channel = seed_channel(&db, "@sponsor_one", 100, true).await;
        let service = SponsorService::new(db.clone(), FakeProvider::reporting(true));

        let first = service.check_membership(1, channel.id).await.unwrap();
        assert!(first.is_member);
        assert_eq!(first.points_awarded, 100);
        assert_eq!(first.points_earned, 100);
        assert_eq!(first.user_points, 100);

        // provider 仍然报告 true: 不再发放
        let second = service.check_membership(1, channel.id).await.unwrap();
        assert!(second.is_member);
        assert_eq!(second.points_awarded, 0);
        assert_eq!(second.points_earned, 100);
        assert_eq!(second.user_points, 100);

        let row = memberships::Entity::find()
            .filter(memberships::Column::UserId.eq(1))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.check_count, 2);
        assert!(row.joined_at.is_some());
    }

    #[tokio::test]
    async fn test_no_bot_access_rejects_without_state_change() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let channel = seed_channel(&db, "@closed_channel", 100, false).await;
        let service = SponsorService::new(db.clone(), FakeProvider::reporting(true));

        let err = service.check_membership(1, channel.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotEligible(_)));

        // 没有创建任何状态行
        let rows = memberships::Entity::find().all(&db).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_state_untouched() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let channel = seed_channel(&db, "@sponsor_one", 100, true).await;
        let provider = FakeProvider::reporting(true);
        provider.unavailable.store(true, Ordering::SeqCst);
        let service = SponsorService::new(db.clone(), provider.clone());

        let err = service.check_membership(1, channel.id).await.unwrap_err();
        assert!(matches!(err, AppError::ProviderUnavailable(_)));

        // 行被惰性创建但没有任何对账变更, 用户积分不变
        let row = memberships::Entity::find().one(&db).await.unwrap().unwrap();
        assert!(!row.is_member);
        assert_eq!(row.points_earned, 0);
        assert_eq!(row.check_count, 0);
        let user = users::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
        assert_eq!(user.points, 0);

        // 恢复后重试成功且只发放一次
        provider.unavailable.store(false, Ordering::SeqCst);
        let ok = service.check_membership(1, channel.id).await.unwrap();
        assert_eq!(ok.points_awarded, 100);
    }

    #[tokio::test]
    async fn test_leaving_keeps_earned_points() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let channel = seed_channel(&db, "@sponsor_one", 100, true).await;
        let provider = FakeProvider::reporting(true);
        let service = SponsorService::new(db.clone(), provider.clone());

        service.check_membership(1, channel.id).await.unwrap();

        // 用户退出频道
        provider.member.store(false, Ordering::SeqCst);
        let after_leave = service.check_membership(1, channel.id).await.unwrap();
        assert!(!after_leave.is_member);
        assert_eq!(after_leave.points_earned, 100);
        assert_eq!(after_leave.user_points, 100);
        let row = memberships::Entity::find().one(&db).await.unwrap().unwrap();
        assert!(row.left_at.is_some());

        // 重新加入: 再次 false->true 转换会再次发放 (设计如此, 见 DESIGN.md)
        provider.member.store(true, Ordering::SeqCst);
        let rejoined = service.check_membership(1, channel.id).await.unwrap();
        assert_eq!(rejoined.points_awarded, 100);
        assert_eq!(rejoined.points_earned, 200);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_checks_award_exactly_once() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let channel = seed_channel(&db, "@sponsor_one", 100, true).await;
        let provider = FakeProvider {
            member: Arc::new(AtomicBool::new(true)),
            unavailable: Arc::new(AtomicBool::new(false)),
            delay_ms: 50,
        };
        let service = Arc::new(SponsorService::new(db.clone(), provider));

        // 两个重复请求同时在飞: 都会从 provider 观察到 true,
        // 但只有一个能完成 false->true 的条件写
        let s1 = service.clone();
        let s2 = service.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { s1.check_membership(1, channel.id).await }),
            tokio::spawn(async move { s2.check_membership(1, channel.id).await }),
        );
        let r1 = r1.unwrap().unwrap();
        let r2 = r2.unwrap().unwrap();

        let awarded: Vec<i64> = vec![r1.points_awarded, r2.points_awarded];
        assert!(awarded.contains(&100));
        assert_eq!(awarded.iter().sum::<i64>(), 100);

        let user = users::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
        assert_eq!(user.points, 100);
        let row = memberships::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(row.points_earned, 100);
        assert_eq!(row.check_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_channel_and_user() {
        let db = setup_db().await;
        let service = SponsorService::new(db.clone(), FakeProvider::reporting(true));
        assert!(matches!(
            service.check_membership(1, 404).await.unwrap_err(),
            AppError::NotFound(_)
        ));

        let channel = seed_channel(&db, "@sponsor_one", 100, true).await;
        assert!(matches!(
            service.check_membership(9, channel.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_list_channels_ordered() {
        let db = setup_db().await;
        seed_channel(&db, "@sponsor_b", 50, true).await;
        seed_channel(&db, "@sponsor_a", 100, true).await;
        let service = SponsorService::new(db.clone(), FakeProvider::reporting(true));
        let list = service.list_channels().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].channel_id, "@sponsor_b");
    }
}

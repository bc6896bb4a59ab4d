use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

/// 每升一级所需积分
pub const POINTS_PER_LEVEL: i64 = 1000;

/// 等级公式的唯一出处: level = floor(points / 1000) + 1。
/// level 列只是它的缓存, 任何时候都能由 points 重新算出。
pub fn level_for_points(points: i64) -> i32 {
    (points / POINTS_PER_LEVEL + 1) as i32
}

/// 积分发放原因, 进日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardReason {
    SponsorMembership,
    Referral,
}

impl std::fmt::Display for AwardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AwardReason::SponsorMembership => write!(f, "sponsor_membership"),
            AwardReason::Referral => write!(f, "referral"),
        }
    }
}

/// 给用户加积分并重算等级, 返回 (新积分, 新等级)。
///
/// 必须在决定发放的那次操作的事务里调用 (conn 传事务),
/// 保证来源实体的变更与积分增加要么同时提交要么都不提交。
/// 加法用 SQL 表达式 points = points + delta, 不做读-改-写。
pub async fn award_points<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    delta: i64,
    reason: AwardReason,
) -> AppResult<(i64, i32)> {
    if delta <= 0 {
        return Err(AppError::ValidationError(
            "Point delta must be a positive integer".to_string(),
        ));
    }

    let res = users::Entity::update_many()
        .col_expr(
            users::Column::Points,
            Expr::col(users::Column::Points).add(delta),
        )
        .col_expr(
            users::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(users::Column::Id.eq(user_id))
        .exec(conn)
        .await?;
    if res.rows_affected == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let user = users::Entity::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let level = level_for_points(user.points);
    if level != user.level {
        users::Entity::update_many()
            .col_expr(users::Column::Level, Expr::value(level))
            .filter(users::Column::Id.eq(user_id))
            .exec(conn)
            .await?;
    }

    log::info!(
        "Awarded {delta} points to user {user_id} ({reason}), total {} level {level}",
        user.points
    );

    Ok((user.points, level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{seed_user, setup_db};
    use sea_orm::TransactionTrait;

    #[test]
    fn test_level_formula() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(999), 1);
        assert_eq!(level_for_points(1000), 2);
        assert_eq!(level_for_points(1999), 2);
        assert_eq!(level_for_points(2000), 3);
        assert_eq!(level_for_points(10_000), 11);
    }

    #[tokio::test]
    async fn test_award_points_updates_total_and_level() {
        let db = setup_db().await;
        seed_user(&db, 1).await;

        let txn = db.begin().await.unwrap();
        let (points, level) = award_points(&txn, 1, 950, AwardReason::Referral)
            .await
            .unwrap();
        txn.commit().await.unwrap();
        assert_eq!(points, 950);
        assert_eq!(level, 1);

        let txn = db.begin().await.unwrap();
        let (points, level) = award_points(&txn, 1, 100, AwardReason::SponsorMembership)
            .await
            .unwrap();
        txn.commit().await.unwrap();
        assert_eq!(points, 1050);
        assert_eq!(level, 2);

        let user = users::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
        assert_eq!(user.points, 1050);
        assert_eq!(user.level, 2);
    }

    #[tokio::test]
    async fn test_award_points_rejects_non_positive_delta() {
        let db = setup_db().await;
        seed_user(&db, 1).await;

        let txn = db.begin().await.unwrap();
        let err = award_points(&txn, 1, 0, AwardReason::Referral)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        let err = award_points(&txn, 1, -5, AwardReason::Referral)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_award_points_unknown_user() {
        let db = setup_db().await;
        let txn = db.begin().await.unwrap();
        let err = award_points(&txn, 404, 10, AwardReason::Referral)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

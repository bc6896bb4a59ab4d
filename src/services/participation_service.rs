use crate::entities::{
    raffle_entity as raffles, raffle_participant_entity as participants,
    raffle_view_entity as views, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{JoinRaffleResponse, RaffleStatus};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

#[derive(Clone)]
pub struct ParticipationService {
    pool: DatabaseConnection,
}

impl ParticipationService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 参加抽奖。前置条件按序检查:
    /// 存在 -> 已批准 -> 未开奖 -> 等级达标 -> 未参加过。
    /// 参与记录插入与 participant_count 自增在同一事务,
    /// (raffle_id, user_id) 唯一索引兜底并发重复参加。
    pub async fn join(&self, raffle_id: i64, user_id: i64) -> AppResult<JoinRaffleResponse> {
        let txn = self.pool.begin().await?;

        let raffle = raffles::Entity::find_by_id(raffle_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Raffle not found".to_string()))?;
        if raffle.status != RaffleStatus::Approved {
            return Err(AppError::InvalidStateTransition(format!(
                "Raffle is {}, only approved raffles can be joined",
                raffle.status
            )));
        }
        let now = Utc::now();
        if raffle.is_expired(now) {
            return Err(AppError::Expired("Raffle has already ended".to_string()));
        }

        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if user.level < raffle.level_required {
            return Err(AppError::NotEligible(format!(
                "Level {} required, user is level {}",
                raffle.level_required, user.level
            )));
        }

        let already = participants::Entity::find()
            .filter(participants::Column::RaffleId.eq(raffle_id))
            .filter(participants::Column::UserId.eq(user_id))
            .one(&txn)
            .await?;
        if already.is_some() {
            return Err(AppError::AlreadyExists(
                "User already joined this raffle".to_string(),
            ));
        }

        participants::ActiveModel {
            raffle_id: Set(raffle_id),
            user_id: Set(user_id),
            created_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::already_exists_on_conflict(e, "User already joined this raffle"))?;

        raffles::Entity::update_many()
            .col_expr(
                raffles::Column::ParticipantCount,
                Expr::col(raffles::Column::ParticipantCount).add(1),
            )
            .col_expr(raffles::Column::UpdatedAt, Expr::value(now))
            .filter(raffles::Column::Id.eq(raffle_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        log::info!("User {user_id} joined raffle #{raffle_id}");
        Ok(JoinRaffleResponse {
            raffle_id,
            participant_count: raffle.participant_count + 1,
        })
    }

    /// 幂等的"已查看"标记。无资格检查, 重复调用永不报错。
    pub async fn mark_seen(&self, raffle_id: i64, user_id: i64) -> AppResult<()> {
        let insert = views::ActiveModel {
            raffle_id: Set(raffle_id),
            user_id: Set(user_id),
            seen_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(&self.pool)
        .await;
        match insert {
            Ok(_) => Ok(()),
            // 已有标记
            Err(e) if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

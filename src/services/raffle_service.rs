use crate::entities::{
    admin_action_entity as admin_actions, raffle_entity as raffles, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    EditRaffleRequest, RaffleResponse, RaffleSnapshot, RaffleStatus, ReviewDecision,
    SubmitRaffleRequest,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};

const MAX_TITLE_LEN: usize = 128;
const MAX_REQUIRED_CHANNELS: usize = 10;

#[derive(Clone)]
pub struct RaffleService {
    pool: DatabaseConnection,
}

impl RaffleService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 提交抽奖申请。
    ///
    /// 校验全部必填字段后以 pending 状态入库:
    /// - request_number = 该提交者现有最大值 + 1 (按提交者独立编号)
    /// - version = 1, original_data = [v1 快照]
    /// - 同一事务内递增提交者的 submission_count
    pub async fn submit(&self, req: SubmitRaffleRequest) -> AppResult<RaffleResponse> {
        validate_submit(&req)?;

        let txn = self.pool.begin().await?;

        let submitter = users::Entity::find_by_id(req.submitter_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Submitter not found".to_string()))?;
        let now = Utc::now();
        if submitter.is_restricted(now) {
            return Err(AppError::NotEligible(
                "Submitter is currently restricted from submitting raffles".to_string(),
            ));
        }

        let request_number = next_request_number(&txn, req.submitter_id).await?;

        let snapshot = RaffleSnapshot {
            version: 1,
            channel_name: req.channel_name.clone(),
            message_id: req.message_id,
            title: req.title.clone(),
            prize_type: req.prize_type.clone(),
            prize_value: req.prize_value,
            required_channels: req.required_channels.clone(),
            raffle_datetime: req.raffle_datetime,
        };
        let original_data = serde_json::to_value(vec![&snapshot])?;

        let model = raffles::ActiveModel {
            submitter_id: Set(req.submitter_id),
            request_number: Set(request_number),
            channel_name: Set(req.channel_name.clone()),
            message_id: Set(req.message_id),
            title: Set(req.title.trim().to_string()),
            prize_type: Set(req.prize_type.clone()),
            prize_value: Set(req.prize_value),
            required_channels: Set(serde_json::to_value(&req.required_channels)?),
            raffle_datetime: Set(req.raffle_datetime),
            status: Set(RaffleStatus::Pending),
            level_required: Set(1),
            participant_count: Set(0),
            version: Set(1),
            original_data: Set(original_data),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        users::Entity::update_many()
            .col_expr(
                users::Column::SubmissionCount,
                Expr::col(users::Column::SubmissionCount).add(1),
            )
            .filter(users::Column::Id.eq(req.submitter_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        log::info!(
            "Raffle #{} submitted by user {} (request number {request_number})",
            model.id,
            model.submitter_id
        );
        Ok(RaffleResponse::from(model))
    }

    /// 审核 (approve / reject)。终态不可逆:
    /// 状态转换是条件写 (where status = pending), 竞争的第二次审核
    /// 拿到 rows_affected = 0, 返回 InvalidStateTransition。
    /// 同一事务追加一条审计日志。
    pub async fn review(
        &self,
        raffle_id: i64,
        reviewer_id: i64,
        decision: ReviewDecision,
        level_required: Option<i32>,
        rejection_reason: Option<String>,
    ) -> AppResult<RaffleResponse> {
        let rejection_reason = rejection_reason.map(|r| r.trim().to_string());
        if decision == ReviewDecision::Rejected
            && rejection_reason.as_deref().unwrap_or("").is_empty()
        {
            return Err(AppError::ValidationError(
                "A rejection reason is required when rejecting".to_string(),
            ));
        }
        if let Some(level) = level_required
            && level < 1
        {
            return Err(AppError::ValidationError(
                "level_required must be at least 1".to_string(),
            ));
        }

        let txn = self.pool.begin().await?;

        let raffle = raffles::Entity::find_by_id(raffle_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Raffle not found".to_string()))?;
        if !raffle.is_pending() {
            return Err(AppError::InvalidStateTransition(format!(
                "Raffle is already {}",
                raffle.status
            )));
        }

        let now = Utc::now();
        let mut update = raffles::Entity::update_many()
            .col_expr(raffles::Column::ReviewerId, Expr::value(reviewer_id))
            .col_expr(raffles::Column::UpdatedAt, Expr::value(now))
            .filter(raffles::Column::Id.eq(raffle_id))
            .filter(raffles::Column::Status.eq(RaffleStatus::Pending));
        update = match decision {
            ReviewDecision::Approved => update
                .col_expr(raffles::Column::Status, Expr::value(RaffleStatus::Approved))
                .col_expr(
                    raffles::Column::LevelRequired,
                    Expr::value(level_required.unwrap_or(1)),
                ),
            ReviewDecision::Rejected => update
                .col_expr(raffles::Column::Status, Expr::value(RaffleStatus::Rejected))
                .col_expr(
                    raffles::Column::RejectionReason,
                    Expr::value(rejection_reason.clone()),
                ),
        };
        let res = update.exec(&txn).await?;
        if res.rows_affected == 0 {
            // 本事务读到 pending 之后被并发审核抢先提交
            return Err(AppError::InvalidStateTransition(
                "Raffle is no longer pending".to_string(),
            ));
        }

        admin_actions::ActiveModel {
            admin_id: Set(reviewer_id),
            raffle_id: Set(raffle_id),
            action: Set(decision.clone()),
            reason: Set(rejection_reason),
            created_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let updated = raffles::Entity::find_by_id(raffle_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::InternalError("Raffle vanished during review".to_string()))?;
        txn.commit().await?;

        log::info!("Raffle #{raffle_id} reviewed by {reviewer_id}: {decision:?}");
        Ok(RaffleResponse::from(updated))
    }

    /// 编辑 pending 状态的申请: 应用补丁, version + 1,
    /// 并把补丁后的完整快照追加进 original_data (审计/回滚用)。
    /// 乐观写: where status = pending and version = 读到的版本。
    pub async fn edit(&self, raffle_id: i64, patch: EditRaffleRequest) -> AppResult<RaffleResponse> {
        let txn = self.pool.begin().await?;

        let raffle = raffles::Entity::find_by_id(raffle_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Raffle not found".to_string()))?;
        if !raffle.is_pending() {
            return Err(AppError::InvalidStateTransition(format!(
                "Only pending raffles can be edited, this one is {}",
                raffle.status
            )));
        }

        // 在当前值上应用补丁再整体校验
        let patched = RaffleSnapshot {
            version: raffle.version + 1,
            channel_name: patch
                .channel_name
                .clone()
                .unwrap_or_else(|| raffle.channel_name.clone()),
            message_id: patch.message_id.unwrap_or(raffle.message_id),
            title: patch
                .title
                .clone()
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| raffle.title.clone()),
            prize_type: patch
                .prize_type
                .clone()
                .unwrap_or_else(|| raffle.prize_type.clone()),
            prize_value: patch.prize_value.unwrap_or(raffle.prize_value),
            required_channels: patch.required_channels.clone().unwrap_or_else(|| {
                serde_json::from_value(raffle.required_channels.clone()).unwrap_or_default()
            }),
            raffle_datetime: patch.raffle_datetime.unwrap_or(raffle.raffle_datetime),
        };
        validate_fields(
            &patched.channel_name,
            patched.message_id,
            &patched.title,
            patched.prize_value,
            &patched.required_channels,
            patched.raffle_datetime,
        )?;

        let mut history: Vec<RaffleSnapshot> =
            serde_json::from_value(raffle.original_data.clone()).unwrap_or_default();
        history.push(patched.clone());

        let res = raffles::Entity::update_many()
            .col_expr(
                raffles::Column::ChannelName,
                Expr::value(patched.channel_name.clone()),
            )
            .col_expr(raffles::Column::MessageId, Expr::value(patched.message_id))
            .col_expr(raffles::Column::Title, Expr::value(patched.title.clone()))
            .col_expr(
                raffles::Column::PrizeType,
                Expr::value(patched.prize_type.clone()),
            )
            .col_expr(
                raffles::Column::PrizeValue,
                Expr::value(patched.prize_value),
            )
            .col_expr(
                raffles::Column::RequiredChannels,
                Expr::value(serde_json::to_value(&patched.required_channels)?),
            )
            .col_expr(
                raffles::Column::RaffleDatetime,
                Expr::value(patched.raffle_datetime),
            )
            .col_expr(raffles::Column::Version, Expr::value(raffle.version + 1))
            .col_expr(
                raffles::Column::OriginalData,
                Expr::value(serde_json::to_value(&history)?),
            )
            .col_expr(raffles::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(raffles::Column::Id.eq(raffle_id))
            .filter(raffles::Column::Status.eq(RaffleStatus::Pending))
            .filter(raffles::Column::Version.eq(raffle.version))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::InvalidStateTransition(
                "Raffle was reviewed or edited concurrently".to_string(),
            ));
        }

        let updated = raffles::Entity::find_by_id(raffle_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::InternalError("Raffle vanished during edit".to_string()))?;
        txn.commit().await?;

        Ok(RaffleResponse::from(updated))
    }

    pub async fn get(&self, raffle_id: i64) -> AppResult<RaffleResponse> {
        let raffle = raffles::Entity::find_by_id(raffle_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Raffle not found".to_string()))?;
        Ok(RaffleResponse::from(raffle))
    }
}

async fn next_request_number<C: ConnectionTrait>(conn: &C, submitter_id: i64) -> AppResult<i64> {
    #[derive(Debug, sea_orm::FromQueryResult)]
    struct MaxRow {
        max_number: Option<i64>,
    }
    let max = raffles::Entity::find()
        .filter(raffles::Column::SubmitterId.eq(submitter_id))
        .select_only()
        .column_as(raffles::Column::RequestNumber.max(), "max_number")
        .into_model::<MaxRow>()
        .one(conn)
        .await?
        .and_then(|r| r.max_number)
        .unwrap_or(0);
    Ok(max + 1)
}

fn validate_submit(req: &SubmitRaffleRequest) -> AppResult<()> {
    validate_fields(
        &req.channel_name,
        req.message_id,
        &req.title,
        req.prize_value,
        &req.required_channels,
        req.raffle_datetime,
    )
}

fn validate_fields(
    channel_name: &str,
    message_id: i64,
    title: &str,
    prize_value: i64,
    required_channels: &[String],
    raffle_datetime: chrono::DateTime<Utc>,
) -> AppResult<()> {
    if !is_valid_channel_ref(channel_name) {
        return Err(AppError::ValidationError(format!(
            "Invalid channel name: {channel_name}"
        )));
    }
    if message_id <= 0 {
        return Err(AppError::ValidationError(
            "message_id must be positive".to_string(),
        ));
    }
    let title = title.trim();
    if title.is_empty() || title.len() > MAX_TITLE_LEN {
        return Err(AppError::ValidationError(format!(
            "Title must be 1-{MAX_TITLE_LEN} characters"
        )));
    }
    if prize_value <= 0 {
        return Err(AppError::ValidationError(
            "prize_value must be positive".to_string(),
        ));
    }
    if required_channels.is_empty() || required_channels.len() > MAX_REQUIRED_CHANNELS {
        return Err(AppError::ValidationError(format!(
            "required_channels must list 1-{MAX_REQUIRED_CHANNELS} channels"
        )));
    }
    for ch in required_channels {
        if !is_valid_channel_ref(ch) {
            return Err(AppError::ValidationError(format!(
                "Invalid required channel: {ch}"
            )));
        }
    }
    if raffle_datetime <= Utc::now() {
        return Err(AppError::ValidationError(
            "raffle_datetime must be in the future".to_string(),
        ));
    }
    Ok(())
}

/// 频道引用: "@username" (4-32位字母数字下划线) 或数字 chat id
fn is_valid_channel_ref(s: &str) -> bool {
    if let Some(name) = s.strip_prefix('@') {
        return (4..=32).contains(&name.len())
            && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    }
    // -1001234567890 形式
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{seed_user, setup_db};
    use chrono::Duration;
    use sea_orm::PaginatorTrait;

    fn valid_request(submitter_id: i64) -> SubmitRaffleRequest {
        SubmitRaffleRequest {
            submitter_id,
            channel_name: "@prize_channel".to_string(),
            message_id: 42,
            title: "100 Stars Giveaway".to_string(),
            prize_type: crate::models::PrizeType::Stars,
            prize_value: 100,
            required_channels: vec!["@sponsor_one".to_string()],
            raffle_datetime: Utc::now() + Duration::days(3),
        }
    }

    #[test]
    fn test_channel_ref_validation() {
        assert!(is_valid_channel_ref("@prize_channel"));
        assert!(is_valid_channel_ref("-1001234567890"));
        assert!(!is_valid_channel_ref("prize_channel"));
        assert!(!is_valid_channel_ref("@ab"));
        assert!(!is_valid_channel_ref("@bad name"));
        assert!(!is_valid_channel_ref(""));
    }

    #[tokio::test]
    async fn test_submit_assigns_per_submitter_request_numbers() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        seed_user(&db, 2).await;
        let service = RaffleService::new(db.clone());

        let a1 = service.submit(valid_request(1)).await.unwrap();
        let a2 = service.submit(valid_request(1)).await.unwrap();
        // 其他提交者不影响编号
        let b1 = service.submit(valid_request(2)).await.unwrap();

        assert_eq!(a1.request_number, 1);
        assert_eq!(a2.request_number, 2);
        assert_eq!(b1.request_number, 1);
        assert_eq!(a1.status, RaffleStatus::Pending);
        assert_eq!(a1.version, 1);

        let submitter = users::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
        assert_eq!(submitter.submission_count, 2);
    }

    #[tokio::test]
    async fn test_submit_validation_errors() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let service = RaffleService::new(db.clone());

        let mut req = valid_request(1);
        req.title = "  ".to_string();
        assert!(matches!(
            service.submit(req).await.unwrap_err(),
            AppError::ValidationError(_)
        ));

        let mut req = valid_request(1);
        req.raffle_datetime = Utc::now() - Duration::hours(1);
        assert!(matches!(
            service.submit(req).await.unwrap_err(),
            AppError::ValidationError(_)
        ));

        let mut req = valid_request(1);
        req.required_channels = vec![];
        assert!(matches!(
            service.submit(req).await.unwrap_err(),
            AppError::ValidationError(_)
        ));

        let mut req = valid_request(1);
        req.prize_value = 0;
        assert!(matches!(
            service.submit(req).await.unwrap_err(),
            AppError::ValidationError(_)
        ));
    }

    #[tokio::test]
    async fn test_submit_requires_known_unrestricted_user() {
        let db = setup_db().await;
        let service = RaffleService::new(db.clone());

        assert!(matches!(
            service.submit(valid_request(99)).await.unwrap_err(),
            AppError::NotFound(_)
        ));

        let user = seed_user(&db, 1).await;
        use sea_orm::IntoActiveModel;
        let mut am = user.into_active_model();
        am.restricted_until = Set(Some(Utc::now() + Duration::days(1)));
        am.update(&db).await.unwrap();
        assert!(matches!(
            service.submit(valid_request(1)).await.unwrap_err(),
            AppError::NotEligible(_)
        ));
    }

    #[tokio::test]
    async fn test_review_approve_is_terminal() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let service = RaffleService::new(db.clone());
        let raffle = service.submit(valid_request(1)).await.unwrap();

        let approved = service
            .review(raffle.id, 500, ReviewDecision::Approved, Some(2), None)
            .await
            .unwrap();
        assert_eq!(approved.status, RaffleStatus::Approved);
        assert_eq!(approved.level_required, 2);
        assert_eq!(approved.reviewer_id, Some(500));

        // 终态后任何再审核都失败
        let err = service
            .review(raffle.id, 500, ReviewDecision::Rejected, None, Some("no".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        // 审计日志存在
        let audits = admin_actions::Entity::find()
            .filter(admin_actions::Column::RaffleId.eq(raffle.id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(audits, 1);
    }

    #[tokio::test]
    async fn test_review_reject_requires_reason() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let service = RaffleService::new(db.clone());
        let raffle = service.submit(valid_request(1)).await.unwrap();

        let err = service
            .review(raffle.id, 500, ReviewDecision::Rejected, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let rejected = service
            .review(
                raffle.id,
                500,
                ReviewDecision::Rejected,
                None,
                Some("duplicate prize post".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, RaffleStatus::Rejected);
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("duplicate prize post")
        );
    }

    #[tokio::test]
    async fn test_review_missing_raffle() {
        let db = setup_db().await;
        let service = RaffleService::new(db.clone());
        let err = service
            .review(777, 500, ReviewDecision::Approved, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_edit_versions_and_snapshots() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let service = RaffleService::new(db.clone());
        let raffle = service.submit(valid_request(1)).await.unwrap();

        let edited = service
            .edit(
                raffle.id,
                EditRaffleRequest {
                    title: Some("200 Stars Giveaway".to_string()),
                    prize_value: Some(200),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.version, 2);
        assert_eq!(edited.title, "200 Stars Giveaway");
        assert_eq!(edited.prize_value, 200);
        // 未修改字段保留
        assert_eq!(edited.channel_name, "@prize_channel");

        let stored = raffles::Entity::find_by_id(raffle.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        let history: Vec<RaffleSnapshot> =
            serde_json::from_value(stored.original_data).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, 1);
        assert_eq!(history[0].title, "100 Stars Giveaway");
        assert_eq!(history[1].version, 2);
        assert_eq!(history[1].title, "200 Stars Giveaway");
    }

    #[tokio::test]
    async fn test_edit_rejected_after_review() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let service = RaffleService::new(db.clone());
        let raffle = service.submit(valid_request(1)).await.unwrap();
        service
            .review(raffle.id, 500, ReviewDecision::Approved, None, None)
            .await
            .unwrap();

        let err = service
            .edit(
                raffle.id,
                EditRaffleRequest {
                    title: Some("sneaky change".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }

    #[tokio::test]
    async fn test_edit_validates_patched_fields() {
        let db = setup_db().await;
        seed_user(&db, 1).await;
        let service = RaffleService::new(db.clone());
        let raffle = service.submit(valid_request(1)).await.unwrap();

        let err = service
            .edit(
                raffle.id,
                EditRaffleRequest {
                    raffle_datetime: Some(Utc::now() - Duration::hours(2)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}

use crate::config::Config;
use crate::error::AppError;
use crate::models::*;
use crate::services::{ParticipationService, RaffleService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/raffles",
    tag = "raffle",
    request_body = SubmitRaffleRequest,
    responses(
        (status = 201, description = "提交成功, 状态为 pending", body = RaffleResponse),
        (status = 400, description = "字段校验失败"),
        (status = 403, description = "提交者处于限制窗口"),
        (status = 404, description = "提交者不存在")
    )
)]
/// 提交抽奖申请 (进入审核队列)
pub async fn submit_raffle(
    service: web::Data<RaffleService>,
    body: web::Json<SubmitRaffleRequest>,
) -> Result<HttpResponse> {
    match service.submit(body.into_inner()).await {
        Ok(raffle) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": raffle }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}",
    tag = "raffle",
    params(("id" = i64, Path, description = "抽奖ID")),
    responses(
        (status = 200, description = "获取成功", body = RaffleResponse),
        (status = 404, description = "不存在")
    )
)]
pub async fn get_raffle(
    service: web::Data<RaffleService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get(path.into_inner()).await {
        Ok(raffle) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": raffle }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/raffles/{id}",
    tag = "raffle",
    params(("id" = i64, Path, description = "抽奖ID")),
    request_body = RaffleUpdateRequest,
    responses(
        (status = 200, description = "审核/编辑成功", body = RaffleResponse),
        (status = 400, description = "字段校验失败"),
        (status = 403, description = "审核人不在管理员名单"),
        (status = 404, description = "不存在"),
        (status = 409, description = "状态不允许该操作")
    )
)]
/// 审核或编辑, 由请求体 action 字段区分:
/// - review: 仅管理员名单内的 reviewer_id 可操作, pending -> approved/rejected
/// - edit: 仅 pending 状态可编辑, version + 1
pub async fn update_raffle(
    service: web::Data<RaffleService>,
    config: web::Data<Config>,
    path: web::Path<i64>,
    body: web::Json<RaffleUpdateRequest>,
) -> Result<HttpResponse> {
    let raffle_id = path.into_inner();
    let result = match body.into_inner() {
        RaffleUpdateRequest::Review {
            reviewer_id,
            decision,
            level_required,
            rejection_reason,
        } => {
            if !config.is_admin(reviewer_id) {
                return Ok(AppError::PermissionDenied.error_response());
            }
            service
                .review(raffle_id, reviewer_id, decision, level_required, rejection_reason)
                .await
        }
        RaffleUpdateRequest::Edit {
            channel_name,
            message_id,
            title,
            prize_type,
            prize_value,
            required_channels,
            raffle_datetime,
        } => {
            let patch = EditRaffleRequest {
                channel_name,
                message_id,
                title,
                prize_type,
                prize_value,
                required_channels,
                raffle_datetime,
            };
            service.edit(raffle_id, patch).await
        }
    };
    match result {
        Ok(raffle) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": raffle }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/raffles/{id}/join",
    tag = "raffle",
    params(("id" = i64, Path, description = "抽奖ID")),
    request_body = JoinRaffleRequest,
    responses(
        (status = 201, description = "参加成功", body = JoinRaffleResponse),
        (status = 403, description = "等级不足"),
        (status = 404, description = "抽奖或用户不存在"),
        (status = 409, description = "未批准/已过期/重复参加")
    )
)]
pub async fn join_raffle(
    service: web::Data<ParticipationService>,
    path: web::Path<i64>,
    body: web::Json<JoinRaffleRequest>,
) -> Result<HttpResponse> {
    match service.join(path.into_inner(), body.user_id).await {
        Ok(joined) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": joined }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/raffles/{id}/seen",
    tag = "raffle",
    params(("id" = i64, Path, description = "抽奖ID")),
    request_body = JoinRaffleRequest,
    responses(
        (status = 200, description = "标记成功 (幂等)")
    )
)]
/// 幂等的"已查看"标记, 重复调用总是成功
pub async fn mark_seen(
    service: web::Data<ParticipationService>,
    path: web::Path<i64>,
    body: web::Json<JoinRaffleRequest>,
) -> Result<HttpResponse> {
    match service.mark_seen(path.into_inner(), body.user_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn raffle_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/raffles")
            .route("", web::post().to(submit_raffle))
            .route("/{id}", web::get().to(get_raffle))
            .route("/{id}", web::put().to(update_raffle))
            .route("/{id}/join", web::post().to(join_raffle))
            .route("/{id}/seen", web::post().to(mark_seen)),
    );
}

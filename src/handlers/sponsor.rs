use crate::external::TelegramService;
use crate::models::*;
use crate::services::SponsorService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/sponsors",
    tag = "sponsor",
    responses(
        (status = 200, description = "赞助频道列表", body = Vec<SponsorChannelResponse>)
    )
)]
/// 当前可领奖励的赞助频道, 按 display_order 排序
pub async fn list_sponsors(
    service: web::Data<SponsorService<TelegramService>>,
) -> Result<HttpResponse> {
    match service.list_channels().await {
        Ok(channels) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": channels }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/check-membership/{channel_id}",
    tag = "sponsor",
    params(
        ("user_id" = i64, Path, description = "用户ID"),
        ("channel_id" = i64, Path, description = "赞助频道ID")
    ),
    responses(
        (status = 200, description = "校验完成", body = CheckMembershipResponse),
        (status = 403, description = "机器人无权限查询该频道"),
        (status = 404, description = "频道或用户不存在"),
        (status = 502, description = "上游查询失败")
    )
)]
/// 实时查询成员资格并按需发放积分。
/// 每次 false->true 转换发放一次 points_reward (并发重复检查只算一次转换);
/// 退出不回收已得积分, 重新加入是新的转换, 会再次发放。
pub async fn check_membership(
    service: web::Data<SponsorService<TelegramService>>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (user_id, channel_id) = path.into_inner();
    match service.check_membership(user_id, channel_id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": result }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn sponsor_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/sponsors", web::get().to(list_sponsors)).route(
        "/users/{user_id}/check-membership/{channel_id}",
        web::post().to(check_membership),
    );
}

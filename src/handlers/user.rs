use crate::models::*;
use crate::services::{ReferralService, UserService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/users",
    tag = "user",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "创建成功", body = UserResponse),
        (status = 400, description = "非法的用户ID"),
        (status = 409, description = "用户已存在")
    )
)]
/// 用户首次进入时创建档案, 可携带推荐码
pub async fn create_user(
    service: web::Data<UserService>,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse> {
    match service.create_user(body.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": user }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "user",
    params(("id" = i64, Path, description = "用户ID")),
    responses(
        (status = 200, description = "获取成功", body = UserResponse),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn get_user(
    service: web::Data<UserService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_profile(path.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": user }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/users/{id}/generate-referral",
    tag = "user",
    params(("id" = i64, Path, description = "用户ID")),
    responses(
        (status = 200, description = "推荐链接 (幂等)", body = ReferralLinkResponse),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn generate_referral(
    service: web::Data<ReferralService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.generate_referral_link(path.into_inner()).await {
        Ok(link) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": link }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::post().to(create_user))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}/generate-referral", web::post().to(generate_referral)),
    );
}

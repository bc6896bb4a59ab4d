use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Not eligible: {0}")]
    NotEligible(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Membership provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (actix_web::http::StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::InvalidStateTransition(msg) => {
                log::warn!("Invalid state transition: {msg}");
                (
                    actix_web::http::StatusCode::CONFLICT,
                    "INVALID_STATE_TRANSITION",
                    msg.clone(),
                )
            }
            AppError::Expired(msg) => (actix_web::http::StatusCode::CONFLICT, "EXPIRED", msg.clone()),
            AppError::NotEligible(msg) => {
                (actix_web::http::StatusCode::FORBIDDEN, "NOT_ELIGIBLE", msg.clone())
            }
            AppError::AlreadyExists(msg) => {
                (actix_web::http::StatusCode::CONFLICT, "ALREADY_EXISTS", msg.clone())
            }
            AppError::PermissionDenied => {
                log::warn!("Permission denied");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Permission denied".to_string(),
                )
            }
            AppError::ProviderUnavailable(msg) => {
                log::error!("Membership provider unavailable: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "PROVIDER_UNAVAILABLE",
                    msg.clone(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

impl AppError {
    /// 将唯一约束冲突映射为 AlreadyExists, 其余数据库错误原样返回。
    /// 仅用于本引擎自己守护的行 (参与记录 / 推荐关系): 对这些行来说
    /// 唯一索引就是并发保护本身, 冲突是调用方错误而不是内部故障。
    pub fn already_exists_on_conflict(err: sea_orm::DbErr, msg: &str) -> AppError {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                AppError::AlreadyExists(msg.to_string())
            }
            _ => AppError::DatabaseError(err),
        }
    }
}

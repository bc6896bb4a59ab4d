use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 错误响应里的 error 对象, 与 AppError::error_response 的输出一致
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_matches_error_envelope() {
        use crate::error::AppError;
        use actix_web::ResponseError;

        let status = AppError::NotFound("Raffle not found".to_string())
            .error_response()
            .status();
        assert_eq!(status.as_u16(), 404);

        // error_response 输出的 error 字段形状
        let raw = r#"{"code":"NOT_FOUND","message":"Raffle not found"}"#;
        let parsed: ApiError = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.code, "NOT_FOUND");
        assert_eq!(parsed.message, "Raffle not found");
    }
}

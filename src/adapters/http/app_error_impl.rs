use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, ErrorCode::RateLimited),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials)
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, ErrorCode::Forbidden),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidInput),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict),
            AppError::PriceMismatch { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::PriceMismatch)
            }
            AppError::CapacityFull { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::CapacityFull)
            }
            AppError::NotPurchasable => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::NotPurchasable)
            }
            AppError::ProtectedMember => (StatusCode::CONFLICT, ErrorCode::ProtectedMember),
            AppError::AlreadyAdmitted => (StatusCode::CONFLICT, ErrorCode::AlreadyAdmitted),
            AppError::Gateway(_) => (StatusCode::BAD_GATEWAY, ErrorCode::GatewayError),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Infrastructure details stay in the logs.
        let message = if self.is_transient() {
            tracing::error!(error = ?self, "Request failed");
            match self {
                AppError::Gateway(_) => "Payment gateway unavailable, please retry".to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            tracing::debug!(error = ?self, "Request rejected");
            self.to_string()
        };

        error_resp(status, code, message)
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: String) -> Response {
    let body = serde_json::json!({ "error": message, "code": code.as_str() });
    (status, Json(body)).into_response()
}

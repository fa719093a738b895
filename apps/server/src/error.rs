use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use billwise_core::errors::{DatabaseError, Error as CoreError};
use billwise_core::recurring::RecurringError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Core(e) => match e {
                CoreError::Recurring(RecurringError::NotFound(_))
                | CoreError::Database(DatabaseError::NotFound(_)) => StatusCode::NOT_FOUND,
                CoreError::Recurring(RecurringError::Canceled(_))
                | CoreError::Database(DatabaseError::UniqueViolation(_)) => StatusCode::CONFLICT,
                CoreError::Recurring(RecurringError::InvalidSchedule(_))
                | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

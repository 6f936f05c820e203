use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Service-wide error taxonomy. Every failure surfaced to a client goes
/// through one of these variants. `Upload` is the exception: bill transfer
/// failures are logged and swallowed inside submission, since a bill
/// reference is optional on an expense record.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(String),

    #[error("bill upload failed: {0}")]
    Upload(String),

    #[error("invalid or missing credentials")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("storage error")]
    Store(#[from] sqlx::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Upload(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Store failures carry driver detail that does not belong on the
        // wire; log it and return the generic message.
        if let AppError::Store(ref err) = self {
            log::error!("store error: {err}");
        }

        let status = self.status_code();
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::validation("amount must be a positive integer");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_state_maps_to_conflict() {
        let err = AppError::InvalidState("expense already decided".into());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn store_detail_is_not_leaked() {
        let err = AppError::Store(sqlx::Error::PoolTimedOut);
        assert_eq!(err.to_string(), "storage error");
    }
}

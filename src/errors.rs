// src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use crate::response::ApiResponse;

/// Everything a handler can fail with, one variant per failure kind.
/// Handlers return `Result<HttpResponse, ApiError>` and let actix render
/// the error through the `ResponseError` impl below, so every failure
/// reaches the caller as the same `{ success, message }` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Authenticated but not allowed: wrong owner, self-application,
    /// insufficient role.
    #[error("{0}")]
    Forbidden(String),

    /// Operation not legal in the task's current status.
    #[error("{0}")]
    InvalidState(String),

    /// Missing, invalid or expired credential. Carries no detail so the
    /// caller cannot tell which check failed.
    #[error("Not authorized")]
    Unauthenticated,

    /// Unexpected collaborator failure. The detail is logged server-side
    /// only; the wire gets a generic message.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// The message that is allowed to leave the server.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Something went wrong, please try again later".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for ApiError {
    fn from(err: mongodb::error::Error) -> Self {
        ApiError::Internal(format!("mongodb error: {}", err))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(detail) = self {
            error!("internal error: {}", detail);
        }
        HttpResponse::build(self.status_code())
            .json(ApiResponse::failure(self.public_message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidState("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_never_reaches_the_caller() {
        let err = ApiError::Internal("mongodb error: connection refused at 10.0.0.3".into());
        let msg = err.public_message();
        assert!(!msg.contains("mongodb"));
        assert!(!msg.contains("10.0.0.3"));
    }

    #[test]
    fn unauthenticated_message_is_uniform() {
        assert_eq!(ApiError::Unauthenticated.public_message(), "Not authorized");
    }

    #[test]
    fn other_kinds_surface_their_specific_message() {
        let err = ApiError::Forbidden("You cannot apply to your own task".into());
        assert_eq!(err.public_message(), "You cannot apply to your own task");
    }
}

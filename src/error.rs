use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Closed set of failures the domain layer can surface. The request layer
/// turns these into HTTP responses; nothing here is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("requested principal {requested} exceeds credit ceiling {ceiling}")]
    LimitExceeded { requested: i64, ceiling: i64 },

    #[error("borrower already has a pending or active loan")]
    DuplicateActiveLoan,

    #[error("borrower has no active loan")]
    NoActiveLoan,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid credentials")]
    Unauthorized,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("account is inactive")]
    AccountInactive,

    #[error("email already registered")]
    EmailTaken,

    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::LimitExceeded { .. } | ApiError::NoActiveLoan => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::DuplicateActiveLoan | ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::AccountInactive => StatusCode::FORBIDDEN,
            ApiError::Persistence(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_exceeded_is_unprocessable() {
        let err = ApiError::LimitExceeded {
            requested: 2_000_000,
            ceiling: 1_500_000,
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("2000000"));
    }

    #[test]
    fn persistence_errors_are_server_side() {
        let err = ApiError::Persistence(sqlx::Error::RowNotFound);
        assert!(err.status().is_server_error());
    }

    #[test]
    fn no_active_loan_message() {
        assert_eq!(
            ApiError::NoActiveLoan.to_string(),
            "borrower has no active loan"
        );
    }
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::domain::TransactionStatus;
use crate::ports::RepositoryError;
use crate::validation::ValidationError;

/// Errors raised by the transaction and inquiry core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("Precondition failed: {0}")]
    InvalidPrecondition(String),

    #[error("Product is not available")]
    ProductNotAvailable,

    #[error("Insufficient quantity: requested {requested}, available {available}")]
    InsufficientQuantity { requested: i32, available: i32 },

    #[error("Buyer cannot transact on their own product")]
    SelfTransaction,

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidReviewRating(i32),

    #[error("This party has already reviewed the transaction")]
    ReviewAlreadyExists,

    #[error("Transaction is not completed")]
    TransactionNotCompleted,

    #[error("Invalid inquiry type: {0}")]
    InvalidInquiryType(String),

    #[error("Inquiry has already been answered")]
    InquiryAlreadyResponded,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflicting concurrent update: {0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => CoreError::NotFound(what),
            RepositoryError::Conflict(what) => CoreError::Conflict(what),
            other => CoreError::Repository(other),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Core(err) => match err {
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::NotAuthorized(_) => StatusCode::FORBIDDEN,
                CoreError::InvalidTransition { .. }
                | CoreError::Conflict(_)
                | CoreError::ReviewAlreadyExists
                | CoreError::InquiryAlreadyResponded => StatusCode::CONFLICT,
                CoreError::InvalidPrecondition(_)
                | CoreError::TransactionNotCompleted
                | CoreError::ProductNotAvailable
                | CoreError::InsufficientQuantity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::SelfTransaction
                | CoreError::InvalidReviewRating(_)
                | CoreError::InvalidInquiryType(_)
                | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                CoreError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error_status_code() {
        let error = AppError::from(CoreError::NotFound("transaction".to_string()));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_not_authorized_is_forbidden() {
        let error = AppError::from(CoreError::NotAuthorized("not a party".to_string()));
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_transition_errors_conflict() {
        let error = AppError::from(CoreError::InvalidTransition {
            from: TransactionStatus::Completed,
            to: TransactionStatus::Pending,
        });
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(CoreError::ReviewAlreadyExists).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_precondition_errors_unprocessable() {
        let error = AppError::from(CoreError::InsufficientQuantity {
            requested: 5,
            available: 3,
        });
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            AppError::from(CoreError::TransactionNotCompleted).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::from(CoreError::Validation(ValidationError::new(
            "quantity",
            "must be at least 1",
        )));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_repository_errors_map_to_core_kinds() {
        let not_found = CoreError::from(RepositoryError::NotFound("tx".to_string()));
        assert!(matches!(not_found, CoreError::NotFound(_)));

        let conflict = CoreError::from(RepositoryError::Conflict("stale".to_string()));
        assert!(matches!(conflict, CoreError::Conflict(_)));

        let db = CoreError::from(RepositoryError::Database(sqlx::Error::RowNotFound));
        assert_eq!(
            AppError::from(db).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_unauthorized_error_response() {
        let error = AppError::Unauthorized("missing X-User-Id".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

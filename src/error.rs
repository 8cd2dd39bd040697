use axum::http::StatusCode;
use thiserror::Error;

use crate::query::ValidationError;
use crate::storage::StorageError;
use crate::transform::TransformError;

/// Everything that can end a request early, mapped onto an HTTP status.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transformation failed: {0}")]
    Transformation(#[from] TransformError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => ServiceError::NotFound(key),
            StorageError::InvalidKey(key) => {
                ServiceError::Forbidden(format!("Invalid object key: {}", key))
            }
            other => ServiceError::Storage(other.to_string()),
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Transformation(_)
            | ServiceError::Storage(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client errors carry their own message; server errors only do so when
    /// `expose_detail` is set.
    pub fn public_message(&self, expose_detail: bool) -> String {
        if self.status_code().is_client_error() {
            self.to_string()
        } else if expose_detail {
            format!("Internal server error: {}", self)
        } else {
            "Internal server error".to_string()
        }
    }
}

//! Backend Error Types
//!
//! Errors surfaced by the HTTP layer. The hub itself does not speak this
//! language (its failures are lifecycle transitions on individual
//! connections), but the CRUD services and handlers do.

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::store::StoreError;

/// All failure cases the HTTP surface can report.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Invalid request input
    #[error("{message}")]
    Validation { message: String },

    /// Requester lacks permission for a group operation
    #[error("{message}")]
    Unauthorized { message: String },

    /// Entity does not exist
    #[error("{what} not found")]
    NotFound { what: &'static str },

    /// Entity already exists or state conflicts with the request
    #[error("{message}")]
    Conflict { message: String },

    /// Storage failure
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl BackendError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound { what }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            BackendError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BackendError::unauthorized("no").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            BackendError::not_found("group").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BackendError::from(StoreError::conflict("dup")).status_code(),
            StatusCode::CONFLICT
        );
    }
}

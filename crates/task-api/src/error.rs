//! Error types for control-plane API calls

use crate::classify::{ClassifyError, ErrorClass};

/// Errors from fetching an operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No token cached, or the API answered 401.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The API answered 503.
    #[error("service temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid operation response: {0}")]
    Decode(String),
}

impl ClassifyError for ApiError {
    fn class(&self) -> ErrorClass {
        match self {
            ApiError::Unauthenticated(_) => ErrorClass::AuthExpired,
            ApiError::Unavailable(_) => ErrorClass::Unavailable,
            ApiError::Status { .. } | ApiError::Http(_) | ApiError::Decode(_) => ErrorClass::Other,
        }
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

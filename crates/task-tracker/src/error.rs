//! Terminal failures of a tracked operation

use std::time::Duration;

/// Why polling stopped without the operation finishing.
///
/// Every variant is terminal. In-progress states are not errors and never
/// surface here.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Re-authentication after an expired token failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The API kept rejecting freshly minted tokens.
    #[error("authentication failed: token still rejected after {0} consecutive re-authentications")]
    ReauthLoop(u32),

    /// Too many consecutive "service temporarily unavailable" replies.
    #[error("max retries reached")]
    MaxRetriesReached,

    /// The remote operation reported FAILED.
    #[error("{operation_type} failed: {message}")]
    OperationFailed {
        operation_type: String,
        message: String,
    },

    /// The API returned a snapshot without a status.
    #[error("task status was empty - API error")]
    EmptyStatus,

    /// Any other fetch error, wrapped with the caller's context.
    #[error("{context}: {message}")]
    Fetch { context: String, message: String },

    /// Starting the operation failed before there was anything to poll.
    #[error("{context}: {message}")]
    Start { context: String, message: String },

    #[error("timeout after {0:?} waiting for operation")]
    Timeout(Duration),
}

/// Result alias for tracking operations.
pub type Result<T> = std::result::Result<T, PollError>;

//! Generic control-plane operation envelope
//!
//! Every mutating call against the cloud API returns an operation id. The
//! operation is then observed through a "get operation" call returning the
//! envelope modelled by `OperationState`. This crate defines that envelope,
//! the classification of fetch failures the poller reacts to, and the
//! `TaskApi` seam with a reqwest-backed implementation.

pub mod classify;
pub mod error;
pub mod http;
pub mod state;

pub use classify::{ClassifyError, ErrorClass, classify_status};
pub use error::{ApiError, Result};
pub use http::HttpTaskApi;
pub use state::{OperationState, OperationStatus};

use std::future::Future;
use std::pin::Pin;

/// Read access to remote operations.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn TaskApi>`).
pub trait TaskApi: Send + Sync {
    /// Fetch the current snapshot of one operation.
    fn get_operation<'a>(
        &'a self,
        operation_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<OperationState>> + Send + 'a>>;
}

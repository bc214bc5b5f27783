//! Classification of failed operation fetches
//!
//! The poller only needs to know three things about a failed fetch: did the
//! bearer token expire, is the backend temporarily unavailable, or is it
//! something else. Every other distinction is carried in the error message.

/// How the poller should react to a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bearer token rejected; re-authenticate and retry immediately
    AuthExpired,
    /// Backend temporarily unavailable; bounded retry
    Unavailable,
    /// Anything else; fatal
    Other,
}

/// Implemented by fetch error types so the poller can classify them.
pub trait ClassifyError: std::fmt::Display {
    fn class(&self) -> ErrorClass;
}

/// Classify an HTTP status from the control-plane API.
///
/// 401 means the bearer token expired, 503 means the service is temporarily
/// unavailable. Everything else (including other 5xx) is not retried by the
/// poller.
pub fn classify_status(status: u16) -> ErrorClass {
    match status {
        401 => ErrorClass::AuthExpired,
        503 => ErrorClass::Unavailable,
        _ => ErrorClass::Other,
    }
}

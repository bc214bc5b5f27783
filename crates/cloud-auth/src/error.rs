//! Error types for identity-provider operations

/// Errors from credential configuration and token exchange.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Grant misconfiguration. Never retried.
    #[error("invalid credential configuration: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Identity provider answered with an error status or an unreadable body.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// The response parsed as JSON but `access_token` was missing or not a
    /// string. This is an API contract violation, not a transport problem.
    #[error("malformed access token: {0}")]
    MalformedAccessToken(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Identity endpoint defaults
//!
//! Paths are joined onto the configured identity endpoint. Both can be
//! overridden per client configuration.

/// Path of the refresh-token exchange, relative to the identity endpoint
pub const DEFAULT_REFRESH_PATH: &str = "token/refresh";

/// Path of the OAuth2 token endpoint used by the client-credentials grant
pub const DEFAULT_TOKEN_PATH: &str = "token";

/// Field carrying the bearer token in every token endpoint response
pub const ACCESS_TOKEN_FIELD: &str = "access_token";

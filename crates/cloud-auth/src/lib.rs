//! Cloud identity-provider authentication
//!
//! Obtains and refreshes the bearer token used by every control-plane
//! request. Two grants are supported and exactly one must be configured:
//!
//! 1. Refresh token: form POST of `refresh_token=<token>` to the refresh path
//! 2. Client credentials: standard OAuth2 `client_credentials` grant
//!
//! The token has no local expiry. It is considered valid until a request
//! using it is rejected, at which point the caller invokes
//! `CredentialStore::authenticate()` again and the cached token is replaced.

pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialSettings, CredentialStore, Grant};
pub use error::{Error, Result};
pub use token::{exchange_client_credentials, exchange_refresh_token};

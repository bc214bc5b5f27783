//! Re-authentication seam used by the poller

use std::future::Future;
use std::pin::Pin;

use cloud_auth::CredentialStore;

/// Something that can mint a fresh bearer token.
///
/// Errors are reported as display strings; the poller only needs the message
/// for its terminal authentication error.
pub trait Authenticator: Send + Sync {
    /// Replace the current token unconditionally.
    fn authenticate(&self) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>>;

    /// Mint a token only if none is held yet.
    fn ensure_authenticated(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>>;
}

impl Authenticator for CredentialStore {
    fn authenticate(&self) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>> {
        Box::pin(async move {
            CredentialStore::authenticate(self)
                .await
                .map_err(|e| e.to_string())
        })
    }

    fn ensure_authenticated(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>> {
        Box::pin(async move {
            CredentialStore::ensure_authenticated(self)
                .await
                .map_err(|e| e.to_string())
        })
    }
}

//! Credential store for the control-plane bearer token
//!
//! Holds the configured long-lived secret and the current access token. The
//! token lives in an `ArcSwapOption`: `authenticate()` swaps in a fresh value
//! and concurrent readers always see either the old or the new token. Every
//! clone of the owning `Arc<CredentialStore>` observes the replacement.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use common::Secret;
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_REFRESH_PATH, DEFAULT_TOKEN_PATH};
use crate::error::{Error, Result};
use crate::token;

/// The grant resolved from `CredentialSettings`.
#[derive(Debug)]
pub enum Grant<'a> {
    RefreshToken(&'a Secret<String>),
    ClientCredentials {
        client_id: &'a str,
        client_secret: &'a Secret<String>,
    },
}

impl Grant<'_> {
    /// Grant label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Grant::RefreshToken(_) => "refresh_token",
            Grant::ClientCredentials { .. } => "client_credentials",
        }
    }
}

/// Identity provider endpoint plus the long-lived secret.
///
/// Exactly one of `refresh_token` or the `client_id`/`client_secret` pair must
/// be set. Blank strings count as unset.
#[derive(Debug, Clone)]
pub struct CredentialSettings {
    pub endpoint: String,
    pub refresh_path: String,
    pub token_path: String,
    pub refresh_token: Option<Secret<String>>,
    pub client_id: Option<String>,
    pub client_secret: Option<Secret<String>>,
}

impl CredentialSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            refresh_token: None,
            client_id: None,
            client_secret: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<Secret<String>>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<Secret<String>>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Resolve which grant is configured.
    pub fn grant(&self) -> Result<Grant<'_>> {
        let refresh = self
            .refresh_token
            .as_ref()
            .filter(|t| !t.expose().trim().is_empty());
        let client_id = self
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty());
        let client_secret = self
            .client_secret
            .as_ref()
            .filter(|s| !s.expose().trim().is_empty());

        match (refresh, client_id, client_secret) {
            (Some(refresh), None, None) => Ok(Grant::RefreshToken(refresh)),
            (None, Some(client_id), Some(client_secret)) => Ok(Grant::ClientCredentials {
                client_id,
                client_secret,
            }),
            (None, None, None) => Err(Error::Config(
                "either refresh_token or client_id/client_secret must be configured".into(),
            )),
            (Some(_), _, _) => Err(Error::Config(
                "exactly one of refresh_token or client_id/client_secret may be configured".into(),
            )),
            (None, Some(_), None) => Err(Error::Config(
                "client_id is set but client_secret is missing".into(),
            )),
            (None, None, Some(_)) => Err(Error::Config(
                "client_secret is set but client_id is missing".into(),
            )),
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Shared bearer-token holder.
///
/// There is no expiry timer: the token is used until a request fails with an
/// authentication error, then the caller runs `authenticate()` again.
pub struct CredentialStore {
    settings: CredentialSettings,
    http_client: reqwest::Client,
    access_token: ArcSwapOption<Secret<String>>,
}

impl CredentialStore {
    pub fn new(settings: CredentialSettings, http_client: reqwest::Client) -> Self {
        Self {
            settings,
            http_client,
            access_token: ArcSwapOption::empty(),
        }
    }

    /// Mint a new access token with the configured grant and replace the
    /// cached one.
    ///
    /// Fails with `Error::Config` before any network I/O when the grant is
    /// misconfigured.
    pub async fn authenticate(&self) -> Result<()> {
        let grant = self.settings.grant()?;
        let label = grant.label();

        let result = match grant {
            Grant::RefreshToken(refresh) => {
                let url = self.settings.url_for(&self.settings.refresh_path);
                token::exchange_refresh_token(&self.http_client, &url, refresh.expose()).await
            }
            Grant::ClientCredentials {
                client_id,
                client_secret,
            } => {
                let url = self.settings.url_for(&self.settings.token_path);
                token::exchange_client_credentials(
                    &self.http_client,
                    &url,
                    client_id,
                    client_secret.expose(),
                )
                .await
            }
        };

        match result {
            Ok(access) => {
                self.access_token.store(Some(Arc::new(Secret::new(access))));
                info!(grant = label, "access token replaced");
                Ok(())
            }
            Err(e) => {
                warn!(grant = label, error = %e, "authentication failed");
                Err(e)
            }
        }
    }

    /// Authenticate only if no token is cached yet.
    pub async fn ensure_authenticated(&self) -> Result<()> {
        if self.has_token() {
            return Ok(());
        }
        debug!("no cached access token, authenticating");
        self.authenticate().await
    }

    /// Current access token, if one has been minted.
    pub fn access_token(&self) -> Option<Arc<Secret<String>>> {
        self.access_token.load_full()
    }

    pub fn has_token(&self) -> bool {
        self.access_token.load().is_some()
    }

    /// Drop the cached token so the next `ensure_authenticated()` mints one.
    pub fn invalidate(&self) {
        self.access_token.store(None);
        debug!("access token invalidated");
    }

    pub fn settings(&self) -> &CredentialSettings {
        &self.settings
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}

//! Token endpoint exchanges
//!
//! Handles the two ways of minting a bearer token:
//! 1. Refresh-token exchange (form body `refresh_token=<token>`)
//! 2. OAuth2 client-credentials grant (Basic client auth)
//!
//! Both return only the access token. Responses are parsed as untyped JSON so
//! a missing or mistyped `access_token` can be reported as
//! `Error::MalformedAccessToken` instead of a generic decode failure.

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::constants::ACCESS_TOKEN_FIELD;
use crate::error::{Error, Result};

/// Exchange a long-lived refresh token for a new access token.
///
/// The identity provider must answer exactly 200. Any other status is an
/// error carrying the raw response body.
pub async fn exchange_refresh_token(
    client: &reqwest::Client,
    url: &str,
    refresh_token: &str,
) -> Result<String> {
    debug!(url, "requesting access token with refresh token");
    let response = client
        .post(url)
        .form(&[("refresh_token", refresh_token)])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading token refresh response: {e}")))?;

    if status != StatusCode::OK {
        warn!(%status, "identity provider rejected refresh token");
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    parse_access_token(&body)
}

/// Run the OAuth2 client-credentials grant.
///
/// Client id and secret are sent as HTTP Basic credentials, the grant type as
/// a form field.
pub async fn exchange_client_credentials(
    client: &reqwest::Client,
    url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String> {
    debug!(url, client_id, "requesting access token with client credentials");
    let response = client
        .post(url)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|e| Error::Http(format!("client credentials request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading client credentials response: {e}")))?;

    if !status.is_success() {
        warn!(%status, client_id, "identity provider rejected client credentials");
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    parse_access_token(&body)
}

/// Extract `access_token` from a token endpoint JSON body.
pub fn parse_access_token(body: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;

    match value.get(ACCESS_TOKEN_FIELD) {
        Some(serde_json::Value::String(token)) => Ok(token.clone()),
        Some(other) => Err(Error::MalformedAccessToken(format!(
            "{ACCESS_TOKEN_FIELD} must be a string, got {}",
            json_type(other)
        ))),
        None => Err(Error::MalformedAccessToken(format!(
            "{ACCESS_TOKEN_FIELD} missing from token response"
        ))),
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

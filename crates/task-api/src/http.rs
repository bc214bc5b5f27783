//! reqwest-backed `TaskApi`
//!
//! Issues `GET <base_url>/operations/<id>` with the bearer token currently
//! held by the shared `CredentialStore`. Status codes are mapped onto the
//! sentinel `ApiError` variants the poller classifies.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use cloud_auth::CredentialStore;
use reqwest::header::AUTHORIZATION;
use tracing::{debug, instrument};

use crate::TaskApi;
use crate::classify::{ErrorClass, classify_status};
use crate::error::{ApiError, Result};
use crate::state::OperationState;

/// Operation reader for the control-plane REST API.
pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialStore>,
    timeout: Duration,
}

impl HttpTaskApi {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: Arc<CredentialStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credentials,
            timeout,
        }
    }

    fn operation_url(&self, operation_id: &str) -> String {
        format!(
            "{}/operations/{}",
            self.base_url.trim_end_matches('/'),
            operation_id
        )
    }

    #[instrument(skip(self), fields(url))]
    async fn fetch(&self, operation_id: &str) -> Result<OperationState> {
        let token = self
            .credentials
            .access_token()
            .ok_or_else(|| ApiError::Unauthenticated("no access token cached".into()))?;

        let url = self.operation_url(operation_id);
        tracing::Span::current().record("url", url.as_str());

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token.expose()))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Http(format!("get operation {operation_id}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Http(format!("reading operation {operation_id}: {e}")))?;

        if !status.is_success() {
            debug!(%status, "get operation returned error status");
            return Err(match classify_status(status.as_u16()) {
                ErrorClass::AuthExpired => ApiError::Unauthenticated(body),
                ErrorClass::Unavailable => ApiError::Unavailable(body),
                ErrorClass::Other => ApiError::Status {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{e}: {body}")))
    }
}

impl TaskApi for HttpTaskApi {
    fn get_operation<'a>(
        &'a self,
        operation_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<OperationState>> + Send + 'a>> {
        Box::pin(self.fetch(operation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::OperationStatus;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use cloud_auth::CredentialSettings;
    use tokio::net::TcpListener;

    /// Mock control plane plus identity provider on one listener.
    ///
    /// - `POST /token/refresh` issues `at_valid`, `POST /stale/token/refresh`
    ///   issues `at_stale`
    /// - `GET /operations/{id}` requires `Bearer at_valid`; ids select replies:
    ///   `unavailable` → 503, `missing` → 404, `garbage` → non-JSON body,
    ///   anything else → RUNNING envelope echoing the id as resource_id
    async fn start_control_plane() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let app = axum::Router::new()
                .route(
                    "/token/refresh",
                    axum::routing::post(|| async {
                        axum::Json(serde_json::json!({ "access_token": "at_valid" }))
                    }),
                )
                .route(
                    "/stale/token/refresh",
                    axum::routing::post(|| async {
                        axum::Json(serde_json::json!({ "access_token": "at_stale" }))
                    }),
                )
                .route(
                    "/operations/{id}",
                    axum::routing::get(|headers: HeaderMap, Path(id): Path<String>| async move {
                        let authorized = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            == Some("Bearer at_valid");
                        if !authorized {
                            return (StatusCode::UNAUTHORIZED, "token expired".to_string());
                        }
                        match id.as_str() {
                            "unavailable" => {
                                (StatusCode::SERVICE_UNAVAILABLE, "maintenance".to_string())
                            }
                            "missing" => (StatusCode::NOT_FOUND, "no such operation".to_string()),
                            "garbage" => (StatusCode::OK, "<html>".to_string()),
                            _ => (
                                StatusCode::OK,
                                serde_json::json!({
                                    "status": "RUNNING",
                                    "type": "server.create",
                                    "resource_id": id,
                                })
                                .to_string(),
                            ),
                        }
                    }),
                );
            axum::serve(listener, app).await.unwrap();
        });

        url
    }

    fn api_for(url: &str, refresh_token: &str) -> (HttpTaskApi, Arc<CredentialStore>) {
        let client = reqwest::Client::new();
        let credentials = Arc::new(CredentialStore::new(
            CredentialSettings::new(url).with_refresh_token(refresh_token),
            client.clone(),
        ));
        let api = HttpTaskApi::new(client, url, credentials.clone(), Duration::from_secs(5));
        (api, credentials)
    }

    #[test]
    fn operation_url_joins_base() {
        let client = reqwest::Client::new();
        let credentials = Arc::new(CredentialStore::new(
            CredentialSettings::new("http://iam"),
            client.clone(),
        ));
        let api = HttpTaskApi::new(
            client,
            "https://api.example/v1/",
            credentials,
            Duration::from_secs(1),
        );
        assert_eq!(
            api.operation_url("op-1"),
            "https://api.example/v1/operations/op-1"
        );
    }

    #[tokio::test]
    async fn without_token_is_unauthenticated() {
        let url = start_control_plane().await;
        let (api, _) = api_for(&url, "rt");

        let err = api.get_operation("op-1").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn fetches_envelope_with_bearer_token() {
        let url = start_control_plane().await;
        let (api, credentials) = api_for(&url, "rt");
        credentials.authenticate().await.unwrap();

        let state = api.get_operation("op-42").await.unwrap();
        assert_eq!(state.status, OperationStatus::Running);
        assert_eq!(state.operation_type, "server.create");
        assert_eq!(state.resource_id.as_deref(), Some("op-42"));
    }

    #[tokio::test]
    async fn maps_503_to_unavailable() {
        let url = start_control_plane().await;
        let (api, credentials) = api_for(&url, "rt");
        credentials.authenticate().await.unwrap();

        let err = api.get_operation("unavailable").await.unwrap_err();
        match err {
            ApiError::Unavailable(body) => assert_eq!(body, "maintenance"),
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn maps_other_status_with_body() {
        let url = start_control_plane().await;
        let (api, credentials) = api_for(&url, "rt");
        credentials.authenticate().await.unwrap();

        let err = api.get_operation("missing").await.unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such operation");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_decode_error() {
        let url = start_control_plane().await;
        let (api, credentials) = api_for(&url, "rt");
        credentials.authenticate().await.unwrap();

        let err = api.get_operation("garbage").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn rejected_token_maps_to_unauthenticated() {
        let url = start_control_plane().await;
        // The `/stale` prefix issues a token the API does not accept
        let (_, credentials) = api_for(&format!("{url}/stale"), "rt");
        credentials.authenticate().await.unwrap();
        let api = HttpTaskApi::new(
            reqwest::Client::new(),
            url,
            credentials,
            Duration::from_secs(5),
        );

        let err = api.get_operation("op-1").await.unwrap_err();
        match err {
            ApiError::Unauthenticated(body) => assert_eq!(body, "token expired"),
            other => panic!("expected Unauthenticated, got {other:?}"),
        }
    }
}

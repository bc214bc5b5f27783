//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The refresh token and client secret are loaded from env vars or files and
//! are never stored in the TOML directly to avoid leaking secrets.

use cloud_auth::{CredentialSettings, DEFAULT_REFRESH_PATH, DEFAULT_TOKEN_PATH};
use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use task_tracker::{OperationTimeouts, PollLimits};

/// Env var holding the refresh token
pub const REFRESH_TOKEN_ENV: &str = "CLOUD_REFRESH_TOKEN";
/// Env var holding the client id (overrides `identity.client_id`)
pub const CLIENT_ID_ENV: &str = "CLOUD_CLIENT_ID";
/// Env var holding the client secret
pub const CLIENT_SECRET_ENV: &str = "CLOUD_CLIENT_SECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub identity: IdentityConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Identity provider settings
#[derive(Debug, Deserialize)]
pub struct IdentityConfig {
    pub endpoint: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default)]
    pub client_id: Option<String>,
    /// File containing the refresh token (alternative to CLOUD_REFRESH_TOKEN)
    #[serde(default)]
    pub refresh_token_file: Option<PathBuf>,
    /// File containing the client secret (alternative to CLOUD_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub refresh_token: Option<Secret<String>>,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
}

/// Control-plane API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Poll loop settings
#[derive(Debug, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_max_unavailable_retries")]
    pub max_unavailable_retries: u32,
    #[serde(default = "default_max_consecutive_reauths")]
    pub max_consecutive_reauths: u32,
    #[serde(default = "default_create_timeout")]
    pub create_timeout_secs: u64,
    #[serde(default = "default_update_timeout")]
    pub update_timeout_secs: u64,
    #[serde(default = "default_delete_timeout")]
    pub delete_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            max_unavailable_retries: default_max_unavailable_retries(),
            max_consecutive_reauths: default_max_consecutive_reauths(),
            create_timeout_secs: default_create_timeout(),
            update_timeout_secs: default_update_timeout(),
            delete_timeout_secs: default_delete_timeout(),
        }
    }
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_token_path() -> String {
    DEFAULT_TOKEN_PATH.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_interval() -> u64 {
    5
}

fn default_max_unavailable_retries() -> u32 {
    task_tracker::poller::MAX_UNAVAILABLE_RETRIES
}

fn default_max_consecutive_reauths() -> u32 {
    task_tracker::poller::MAX_CONSECUTIVE_REAUTHS
}

fn default_create_timeout() -> u64 {
    30 * 60
}

fn default_update_timeout() -> u64 {
    20 * 60
}

fn default_delete_timeout() -> u64 {
    20 * 60
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Secret resolution order, per secret:
    /// 1. env var (CLOUD_REFRESH_TOKEN / CLOUD_CLIENT_SECRET)
    /// 2. `*_file` path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML document, then overlay environment variables.
    pub fn from_toml(contents: &str) -> common::Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.validate()?;

        if let Ok(id) = std::env::var(CLIENT_ID_ENV) {
            config.identity.client_id = Some(id);
        }
        config.identity.refresh_token =
            resolve_secret(REFRESH_TOKEN_ENV, config.identity.refresh_token_file.as_deref())?;
        config.identity.client_secret =
            resolve_secret(CLIENT_SECRET_ENV, config.identity.client_secret_file.as_deref())?;

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        for (name, url) in [
            ("identity.endpoint", &self.identity.endpoint),
            ("api.base_url", &self.api.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        for (name, value) in [
            ("api.request_timeout_secs", self.api.request_timeout_secs),
            ("polling.interval_secs", self.polling.interval_secs),
            ("polling.create_timeout_secs", self.polling.create_timeout_secs),
            ("polling.update_timeout_secs", self.polling.update_timeout_secs),
            ("polling.delete_timeout_secs", self.polling.delete_timeout_secs),
        ] {
            if value == 0 {
                return Err(common::Error::Config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("operation-watch.toml")
    }

    pub fn credential_settings(&self) -> CredentialSettings {
        CredentialSettings {
            endpoint: self.identity.endpoint.clone(),
            refresh_path: self.identity.refresh_path.clone(),
            token_path: self.identity.token_path.clone(),
            refresh_token: self.identity.refresh_token.clone(),
            client_id: self.identity.client_id.clone(),
            client_secret: self.identity.client_secret.clone(),
        }
    }

    pub fn poll_limits(&self) -> PollLimits {
        PollLimits {
            max_unavailable_retries: self.polling.max_unavailable_retries,
            max_consecutive_reauths: self.polling.max_consecutive_reauths,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn timeouts(&self) -> OperationTimeouts {
        OperationTimeouts {
            create: Duration::from_secs(self.polling.create_timeout_secs),
            update: Duration::from_secs(self.polling.update_timeout_secs),
            delete: Duration::from_secs(self.polling.delete_timeout_secs),
        }
    }
}

/// Read a secret from `env`, falling back to `file`. Blank values are unset.
fn resolve_secret(env: &str, file: Option<&Path>) -> common::Result<Option<Secret<String>>> {
    if let Ok(value) = std::env::var(env) {
        let value = value.trim().to_owned();
        return Ok((!value.is_empty()).then(|| Secret::new(value)));
    }
    let Some(file) = file else {
        return Ok(None);
    };
    let value = std::fs::read_to_string(file).map_err(|source| common::Error::SecretFile {
        path: file.to_path_buf(),
        source,
    })?;
    let value = value.trim().to_owned();
    Ok((!value.is_empty()).then(|| Secret::new(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloud_auth::Grant;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    unsafe fn clear_secret_env() {
        unsafe {
            remove_env(REFRESH_TOKEN_ENV);
            remove_env(CLIENT_ID_ENV);
            remove_env(CLIENT_SECRET_ENV);
        }
    }

    fn valid_toml() -> &'static str {
        r#"
[identity]
endpoint = "https://iam.example.cloud"

[api]
base_url = "https://api.example.cloud/v1"
"#
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_secret_env() };

        let config = Config::from_toml(valid_toml()).unwrap();
        assert_eq!(config.identity.refresh_path, "token/refresh");
        assert_eq!(config.identity.token_path, "token");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.polling.interval_secs, 5);
        assert_eq!(config.poll_limits(), PollLimits::default());
        assert_eq!(config.timeouts(), OperationTimeouts::default());
        assert!(config.identity.refresh_token.is_none());
    }

    #[test]
    fn load_missing_file_errors() {
        let result = Config::load(Path::new("/nonexistent/operation-watch.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn invalid_toml_errors() {
        let result = Config::from_toml("not valid {{{{ toml");
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn rejects_non_http_urls() {
        let toml = r#"
[identity]
endpoint = "iam.example.cloud"

[api]
base_url = "https://api.example.cloud"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("identity.endpoint"), "got {err}");
    }

    #[test]
    fn rejects_zero_interval() {
        let toml = format!("{}\n[polling]\ninterval_secs = 0\n", valid_toml());
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("polling.interval_secs"), "got {err}");
    }

    #[test]
    fn refresh_token_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_secret_env();
            set_env(REFRESH_TOKEN_ENV, "rt_from_env");
        }

        let config = Config::from_toml(valid_toml()).unwrap();
        let settings = config.credential_settings();
        match settings.grant().unwrap() {
            Grant::RefreshToken(token) => assert_eq!(token.expose(), "rt_from_env"),
            other => panic!("expected refresh token grant, got {other:?}"),
        }

        unsafe { clear_secret_env() };
    }

    #[test]
    fn client_secret_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_secret_env() };

        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("client-secret");
        std::fs::write(&secret_path, "s3cret\n").unwrap();
        let toml = format!(
            r#"
[identity]
endpoint = "https://iam.example.cloud"
client_id = "svc-account"
client_secret_file = "{}"

[api]
base_url = "https://api.example.cloud"
"#,
            secret_path.display()
        );

        let config = Config::from_toml(&toml).unwrap();
        let settings = config.credential_settings();
        match settings.grant().unwrap() {
            Grant::ClientCredentials {
                client_id,
                client_secret,
            } => {
                assert_eq!(client_id, "svc-account");
                assert_eq!(client_secret.expose(), "s3cret");
            }
            other => panic!("expected client credentials grant, got {other:?}"),
        }
    }

    #[test]
    fn missing_secret_file_errors() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_secret_env() };

        let toml = r#"
[identity]
endpoint = "https://iam.example.cloud"
refresh_token_file = "/nonexistent/refresh-token"

[api]
base_url = "https://api.example.cloud/v1"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(matches!(err, common::Error::SecretFile { .. }), "got {err:?}");
        assert!(err.to_string().contains("/nonexistent/refresh-token"), "got {err}");
    }

    #[test]
    fn env_secret_wins_over_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe {
            clear_secret_env();
            set_env(REFRESH_TOKEN_ENV, "rt_env");
        }

        // The file does not exist; the env var means it is never read
        let toml = r#"
[identity]
endpoint = "https://iam.example.cloud"
refresh_token_file = "/nonexistent/refresh-token"

[api]
base_url = "https://api.example.cloud/v1"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(
            config.identity.refresh_token.as_ref().map(|s| s.expose().as_str()),
            Some("rt_env")
        );

        unsafe { clear_secret_env() };
    }

    #[test]
    fn custom_polling_values_flow_into_limits_and_timeouts() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { clear_secret_env() };

        let toml = format!(
            "{}
[polling]
interval_secs = 2
max_unavailable_retries = 4
max_consecutive_reauths = 1
create_timeout_secs = 60
",
            valid_toml()
        );
        let config = Config::from_toml(&toml).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(
            config.poll_limits(),
            PollLimits {
                max_unavailable_retries: 4,
                max_consecutive_reauths: 1,
            }
        );
        assert_eq!(config.timeouts().create, Duration::from_secs(60));
        assert_eq!(config.timeouts().delete, Duration::from_secs(1200));
    }

    #[test]
    fn resolve_path_prefers_cli() {
        assert_eq!(
            Config::resolve_path(Some("/etc/watch.toml")),
            PathBuf::from("/etc/watch.toml")
        );
    }
}

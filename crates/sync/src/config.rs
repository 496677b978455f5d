use std::path::PathBuf;

/// Default location of the SQLite database file.
pub const DEFAULT_STORE_PATH: &str = "letras-offline.db";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Invalid or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Sync agent configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the remote API, without trailing slash.
    pub api_base_url: String,
    /// SQLite database file backing the local store.
    pub store_path: PathBuf,
    /// Bearer token for the session, if one is already known.
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default              |
    /// |------------------------|----------------------|
    /// | `API_BASE_URL`         | required             |
    /// | `LOCAL_STORE_PATH`     | `letras-offline.db`  |
    /// | `API_TOKEN`            | none                 |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                 |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("API_BASE_URL"))?;

        let store_path = lookup("LOCAL_STORE_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_PATH.into())
            .into();

        let api_token = lookup("API_TOKEN").filter(|v| !v.is_empty());

        let request_timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "REQUEST_TIMEOUT_SECS",
                expected: "a whole number of seconds",
                value,
            })?,
        };

        Ok(Self {
            api_base_url,
            store_path,
            api_token,
            request_timeout_secs,
        })
    }
}

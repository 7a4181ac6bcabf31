//! Dashboard Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Config file used when `DASHBOARD_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard";

/// Dashboard client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Inference service base URL
    pub base_url: String,
    /// Cache validity in seconds; 0 keeps entries for the process lifetime
    pub cache_ttl_secs: u64,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Local importances export
    pub importances_path: String,
    /// Client selected at startup
    pub default_client_id: i64,
    /// Default log level; `RUST_LOG` overrides it
    pub log_level: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            cache_ttl_secs: 60,
            request_timeout_secs: 10,
            importances_path: "data/local_importances.json".to_string(),
            default_client_id: 100001,
            log_level: "warn".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load from `DASHBOARD_CONFIG` (or the default path) plus `DASHBOARD__*` env
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let path =
            std::env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from a specific file (missing file falls back to defaults)
    pub fn load_from(path: &str) -> Result<Self, ::config::ConfigError> {
        ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("DASHBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Cache TTL, None for process lifetime
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    /// Request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

//! Service Configuration
//!
//! Layered as: built-in defaults, then an optional TOML file, then
//! `CREDIT__SECTION__KEY` environment variables.

use crate::rate_limit::RateLimitConfig;
use feature_store::DEFAULT_ID_COLUMN;
use scoring::{ModelKind, OnnxOptions};
use serde::{Deserialize, Serialize};

/// Config file used when `CREDIT_CONFIG` is unset (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Feature table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// JSON records file
    pub table_path: String,
    /// Client identifier column
    pub id_column: String,
    /// Rows returned by `/get_first`
    pub sample_size: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            table_path: "data/clients.json".to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            sample_size: 10,
        }
    }
}

/// Scaler and model artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub scaler_path: String,
    pub model_path: String,
    /// ONNX only: output index holding class probabilities
    pub probability_output: usize,
    /// ONNX only: probability column of the default class
    pub positive_class: usize,
}

impl ModelConfig {
    /// ONNX output selection
    pub fn onnx_options(&self) -> OnnxOptions {
        OnnxOptions {
            probability_output: self.probability_output,
            positive_class: self.positive_class,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let onnx = OnnxOptions::default();
        Self {
            kind: ModelKind::Logistic,
            scaler_path: "data/scaler.json".to_string(),
            model_path: "data/model.json".to_string(),
            probability_output: onnx.probability_output,
            positive_class: onnx.positive_class,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ServiceConfig {
    /// Load from `CREDIT_CONFIG` (or the default path) plus environment
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let path =
            std::env::var("CREDIT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from a specific file (missing file falls back to defaults)
    pub fn load_from(path: &str) -> Result<Self, ::config::ConfigError> {
        ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("CREDIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let config = ServiceConfig::load_from("/nonexistent/credit").unwrap();
        assert_eq!(config.data.id_column, "SK_ID_CURR");
        assert_eq!(config.data.sample_size, 10);
        assert_eq!(config.model.kind, ModelKind::Logistic);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_repository_config_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default");
        let config = ServiceConfig::load_from(path).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.data.table_path, "data/clients.json");
        assert_eq!(config.rate_limit.burst_size, 20);
        assert!(!config.logging.json);
    }
}

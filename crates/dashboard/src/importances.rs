//! Local Feature Importances
//!
//! Per-client explanation weights computed offline (approximate SHAP values).

use crate::DashboardError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// One feature's signed contribution to a client's score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientImportances {
    /// Stored as int or float depending on the exporter
    id: f64,
    features: Vec<FeatureImportance>,
}

/// All clients' local importances
#[derive(Debug, Clone, Default)]
pub struct LocalImportances {
    entries: Vec<ClientImportances>,
}

impl LocalImportances {
    /// Parse the JSON export
    pub fn from_json_str(json: &str) -> Result<Self, DashboardError> {
        let entries = serde_json::from_str(json).map_err(|e| DashboardError::Importances(e.to_string()))?;
        Ok(Self { entries })
    }

    /// Load the JSON export from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DashboardError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DashboardError::Importances(format!("{}: {}", path.display(), e)))?;
        let importances = Self::from_json_str(&raw)?;
        info!(
            "Loaded local importances for {} clients from {}",
            importances.entries.len(),
            path.display()
        );
        Ok(importances)
    }

    /// Load, or fall back to an empty set with a warning
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("{}", e);
            Self::default()
        })
    }

    /// Top `n` features for a client by absolute importance
    pub fn top(&self, client_id: i64, n: usize) -> Option<Vec<FeatureImportance>> {
        let entry = self.entries.iter().find(|e| e.id == client_id as f64)?;

        let mut features = entry.features.clone();
        features.sort_by(|a, b| b.importance.abs().total_cmp(&a.importance.abs()));
        features.truncate(n);
        Some(features)
    }

    /// Number of clients with importances
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no importances are loaded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

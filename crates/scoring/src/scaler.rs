//! Standard Scaler
//!
//! Fitted offline; only `transform` runs in the service.

use crate::{read_artifact, ScoringError};
use feature_store::ClientRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Per-feature `(x - mean) / scale` transform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    /// Feature names in model input order
    features: Vec<String>,
    /// Fitted means
    mean: Vec<f64>,
    /// Fitted scales (standard deviations)
    scale: Vec<f64>,
}

impl Scaler {
    /// Create a scaler from fitted parameters
    pub fn new(features: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScoringError> {
        Self { features, mean, scale }.validated()
    }

    /// Load a JSON scaler artifact
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let scaler: Scaler = read_artifact(path)?;
        let scaler = scaler.validated()?;
        info!("Scaler loaded from {} ({} features)", path.display(), scaler.len());
        Ok(scaler)
    }

    fn validated(mut self) -> Result<Self, ScoringError> {
        let expected = self.features.len();
        for actual in [self.mean.len(), self.scale.len()] {
            if actual != expected {
                return Err(ScoringError::ShapeMismatch { expected, actual });
            }
        }

        // Constant features were fitted with a zero scale
        for s in &mut self.scale {
            if *s == 0.0 || !s.is_finite() {
                *s = 1.0;
            }
        }
        Ok(self)
    }

    /// Scale a record into the model input vector.
    ///
    /// Missing or non-numeric values are imputed at the mean (scaled 0.0).
    pub fn transform(&self, record: &ClientRecord) -> Vec<f64> {
        self.features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(name, (mean, scale))| match record.get_f64(name) {
                Some(x) if x.is_finite() => (x - mean) / scale,
                _ => 0.0,
            })
            .collect()
    }

    /// Feature names in input order
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the scaler has no features
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

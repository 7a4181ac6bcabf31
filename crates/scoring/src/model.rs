//! Scoring Models

use crate::{read_artifact, ScoringError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A pre-fitted binary classifier over scaled features
pub trait ScoringModel: Send + Sync {
    /// Probability of the positive (default) class for one scaled row
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ScoringError>;

    /// Expected input width
    fn n_features(&self) -> usize;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// Logistic regression: `sigmoid(intercept + w . x)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LogisticModel {
    /// Create a model from fitted weights
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    /// Load a JSON model artifact
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let model: LogisticModel = read_artifact(path)?;
        if !model.intercept.is_finite() || model.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(ScoringError::ArtifactLoad {
                path: path.display().to_string(),
                reason: "non-finite weight".to_string(),
            });
        }
        info!(
            "Logistic model loaded from {} ({} coefficients)",
            path.display(),
            model.coefficients.len()
        );
        Ok(model)
    }
}

impl ScoringModel for LogisticModel {
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ScoringError> {
        if features.len() != self.coefficients.len() {
            return Err(ScoringError::ShapeMismatch {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }

        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>();

        if z.is_nan() {
            return Err(ScoringError::NonFiniteInput("decision value".to_string()));
        }
        Ok(1.0 / (1.0 + (-z).exp()))
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn describe(&self) -> String {
        format!("logistic({} features)", self.coefficients.len())
    }
}

//! Credit Scoring Engine
//!
//! Applies a pre-fitted scaler and classifier to a client record and returns
//! the probability of default. Models are loaded once and only read afterwards.

mod model;
mod onnx;
mod scaler;
mod scorer;

pub use model::{LogisticModel, ScoringModel};
pub use onnx::OnnxModel;
pub use scaler::Scaler;
pub use scorer::{ModelKind, OnnxOptions, Scorer, ScoringResult};

use thiserror::Error;

/// Errors while loading artifacts or scoring
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Failed to load artifact {path}: {reason}")]
    ArtifactLoad { path: String, reason: String },
    #[error("Shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Input out of range: {0}")]
    NonFiniteInput(String),
}

pub(crate) fn read_artifact<T: serde::de::DeserializeOwned>(
    path: &std::path::Path,
) -> Result<T, ScoringError> {
    let load_err = |reason: String| ScoringError::ArtifactLoad {
        path: path.display().to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| load_err(e.to_string()))
}

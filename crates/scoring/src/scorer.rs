//! Scaler + Model Pipeline

use crate::model::{LogisticModel, ScoringModel};
use crate::onnx::OnnxModel;
use crate::scaler::Scaler;
use crate::ScoringError;
use feature_store::ClientRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Serialized model format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// JSON logistic regression weights
    Logistic,
    /// ONNX classifier run with tract
    Onnx,
}

impl ModelKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Logistic => "logistic",
            ModelKind::Onnx => "onnx",
        }
    }
}

/// Output selection for ONNX classifiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OnnxOptions {
    pub probability_output: usize,
    pub positive_class: usize,
}

impl Default for OnnxOptions {
    fn default() -> Self {
        Self {
            probability_output: 1,
            positive_class: 1,
        }
    }
}

/// Result of scoring one record
#[derive(Debug, Clone, Copy)]
pub struct ScoringResult {
    /// Probability of default in [0, 1]
    pub probability: f64,
    /// Time spent in scale + inference
    pub latency: Duration,
}

/// Scaler and classifier applied in sequence
pub struct Scorer {
    scaler: Scaler,
    model: Box<dyn ScoringModel>,
}

impl Scorer {
    /// Pair a scaler with a model of matching width
    pub fn new(scaler: Scaler, model: Box<dyn ScoringModel>) -> Result<Self, ScoringError> {
        if scaler.len() != model.n_features() {
            return Err(ScoringError::ShapeMismatch {
                expected: model.n_features(),
                actual: scaler.len(),
            });
        }
        Ok(Self { scaler, model })
    }

    /// Load scaler and model artifacts
    pub fn load(
        kind: ModelKind,
        scaler_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
        onnx: OnnxOptions,
    ) -> Result<Self, ScoringError> {
        let scaler = Scaler::load(scaler_path)?;
        let model: Box<dyn ScoringModel> = match kind {
            ModelKind::Logistic => Box::new(LogisticModel::load(model_path)?),
            ModelKind::Onnx => Box::new(OnnxModel::load(
                model_path,
                scaler.len(),
                onnx.probability_output,
                onnx.positive_class,
            )?),
        };

        let scorer = Self::new(scaler, model)?;
        info!("Scorer ready: {}", scorer.describe());
        Ok(scorer)
    }

    /// Scale and score one record
    pub fn score(&self, record: &ClientRecord) -> Result<ScoringResult, ScoringError> {
        let start = Instant::now();

        let features = self.scaler.transform(record);
        if let Some(i) = features.iter().position(|x| !x.is_finite()) {
            return Err(ScoringError::NonFiniteInput(self.scaler.features()[i].clone()));
        }
        let probability = self.model.predict_proba(&features)?;

        let latency = start.elapsed();
        debug!("Scored record in {:?}: p={:.4}", latency, probability);

        Ok(ScoringResult {
            probability,
            latency,
        })
    }

    /// Features the scaler reads, in model input order
    pub fn features(&self) -> &[String] {
        self.scaler.features()
    }

    /// Model description for logs and health output
    pub fn describe(&self) -> String {
        self.model.describe()
    }
}

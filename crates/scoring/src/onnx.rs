//! ONNX Classifier via tract
//!
//! Expects a classifier exported without a zipmap, so the probability output
//! is a plain `[1, n_classes]` tensor.

use crate::model::ScoringModel;
use crate::ScoringError;
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::{debug, info};

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// ONNX classifier loaded and optimized once
pub struct OnnxModel {
    plan: OnnxPlan,
    path: String,
    n_features: usize,
    /// Index of the probability tensor among the outputs
    probability_output: usize,
    /// Column of the positive class in the probability tensor
    positive_class: usize,
}

impl OnnxModel {
    /// Load and optimize an ONNX model with a fixed `[1, n_features]` input
    pub fn load(
        path: impl AsRef<Path>,
        n_features: usize,
        probability_output: usize,
        positive_class: usize,
    ) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        info!("Loading ONNX model from {}", path.display());

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, f32::fact([1, n_features]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ScoringError::ArtifactLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        info!("ONNX model ready ({} features)", n_features);
        Ok(Self {
            plan,
            path: path.display().to_string(),
            n_features,
            probability_output,
            positive_class,
        })
    }

    fn run(&self, features: &[f64]) -> TractResult<Vec<f32>> {
        let values: Vec<f32> = features.iter().map(|x| *x as f32).collect();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, self.n_features), values)?.into();

        let outputs = self.plan.run(tvec!(input.into()))?;
        let output = outputs.get(self.probability_output).ok_or_else(|| {
            TractError::msg(format!(
                "model has {} outputs, probability output {} missing",
                outputs.len(),
                self.probability_output
            ))
        })?;

        let probabilities = output.cast_to::<f32>()?;
        let view = probabilities.to_array_view::<f32>()?;
        Ok(view.iter().copied().collect())
    }
}

impl ScoringModel for OnnxModel {
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ScoringError> {
        if features.len() != self.n_features {
            return Err(ScoringError::ShapeMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let probabilities = self
            .run(features)
            .map_err(|e| ScoringError::Inference(e.to_string()))?;
        debug!("ONNX probabilities: {:?}", probabilities);

        // single-column output is already P(positive)
        let p = match probabilities.as_slice() {
            [single] => *single,
            many => *many.get(self.positive_class).ok_or_else(|| {
                ScoringError::Inference(format!(
                    "positive class {} out of range for {} probabilities",
                    self.positive_class,
                    many.len()
                ))
            })?,
        };

        if !p.is_finite() {
            return Err(ScoringError::Inference("non-finite probability".to_string()));
        }
        Ok(f64::from(p).clamp(0.0, 1.0))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn describe(&self) -> String {
        format!("onnx({}, {} features)", self.path, self.n_features)
    }
}

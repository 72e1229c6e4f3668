//! ONNX inference using tract
//!
//! Both trained models are exported to ONNX and loaded once at startup.
//! Loading probes each model with an all-zero row so that a model whose
//! input or output shape does not match the nine-feature contract fails at
//! startup instead of on the first request.

use super::{ClassScores, HealthClassifier, ScoreRegressor};
use crate::error::{Result, ScoreError};
use crate::models::{FeatureVector, NUM_FEATURES};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Inference latency above which a warning is logged
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// An optimized ONNX graph taking a single `f32 [1, 9]` row
pub struct OnnxModel {
    artifact: String,
    model: TractModel,
}

impl OnnxModel {
    /// Load and optimize an ONNX model from bytes
    pub fn from_bytes(artifact: &str, model_bytes: &[u8]) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| ScoreError::model_load(artifact, format!("failed to parse ONNX: {e:#}")))?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .map_err(|e| ScoreError::model_load(artifact, format!("failed to set input shape: {e:#}")))?
            .into_optimized()
            .map_err(|e| ScoreError::model_load(artifact, format!("failed to optimize: {e:#}")))?
            .into_runnable()
            .map_err(|e| ScoreError::model_load(artifact, format!("failed to create plan: {e:#}")))?;

        Ok(Self {
            artifact: artifact.to_string(),
            model,
        })
    }

    pub fn from_path(artifact: &str, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ScoreError::model_load(artifact, format!("cannot read {}: {}", path.display(), e))
        })?;
        let model = Self::from_bytes(artifact, &bytes)?;
        info!(
            artifact = %artifact,
            path = %path.display(),
            size_bytes = bytes.len(),
            "Loaded ONNX model"
        );
        Ok(model)
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// Run the graph on one feature row
    pub fn run(&self, features: &FeatureVector) -> Result<TVec<TValue>> {
        let start = Instant::now();
        let input = Tensor::from_shape(&[1, NUM_FEATURES], &features.to_array()[..])
            .map_err(|e| ScoreError::Inference(format!("{e:#}")))?;

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| ScoreError::Inference(format!("{} model: {e:#}", self.artifact)))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                artifact = %self.artifact,
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target",
                MAX_INFERENCE_MS
            );
        } else {
            debug!(artifact = %self.artifact, elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(outputs)
    }
}

/// Health label classifier exported with a probability output
///
/// The first `f32` output holding one value per class is read as class
/// probabilities. Without one, the first `i64` output is read as the class
/// index.
pub struct OnnxClassifier {
    model: OnnxModel,
    num_classes: usize,
}

impl OnnxClassifier {
    pub fn new(model: OnnxModel, num_classes: usize) -> Result<Self> {
        let classifier = Self { model, num_classes };
        let probe = FeatureVector::from_array([0.0; NUM_FEATURES]);
        classifier
            .class_scores(&probe)
            .map_err(|e| ScoreError::model_load(classifier.model.artifact(), e))?;
        Ok(classifier)
    }

    pub fn load(path: &Path, num_classes: usize) -> Result<Self> {
        Self::new(OnnxModel::from_path("classifier", path)?, num_classes)
    }

}

impl HealthClassifier for OnnxClassifier {
    fn class_scores(&self, features: &FeatureVector) -> Result<ClassScores> {
        let outputs = self.model.run(features)?;
        read_class_scores(&outputs, self.num_classes)
    }
}

/// Decode classifier outputs: probabilities first, label index as fallback
fn read_class_scores(outputs: &[TValue], num_classes: usize) -> Result<ClassScores> {
    for output in outputs {
        if output.datum_type() == f32::datum_type() && output.len() == num_classes {
            let view = output
                .to_array_view::<f32>()
                .map_err(|e| ScoreError::Inference(format!("{e:#}")))?;
            return Ok(ClassScores::Probabilities(view.iter().copied().collect()));
        }
    }
    for output in outputs {
        if output.datum_type() == i64::datum_type() && output.len() >= 1 {
            let view = output
                .to_array_view::<i64>()
                .map_err(|e| ScoreError::Inference(format!("{e:#}")))?;
            let index = view.iter().next().copied().unwrap_or(-1);
            return usize::try_from(index)
                .map(ClassScores::Index)
                .map_err(|_| ScoreError::Inference(format!("negative class index {}", index)));
        }
    }
    Err(ScoreError::Inference(format!(
        "classifier has no f32 output with {} values and no i64 label output",
        num_classes
    )))
}

/// First value of the first regressor output
fn read_score(outputs: &[TValue]) -> Result<f32> {
    let output = outputs
        .first()
        .ok_or_else(|| ScoreError::Inference("No output from regressor".to_string()))?;
    let view = output
        .to_array_view::<f32>()
        .map_err(|e| ScoreError::Inference(format!("{e:#}")))?;
    view.iter()
        .next()
        .copied()
        .ok_or_else(|| ScoreError::Inference("Regressor output is empty".to_string()))
}

/// NutriScore regressor reading the first value of its first output
pub struct OnnxRegressor {
    model: OnnxModel,
}

impl OnnxRegressor {
    pub fn new(model: OnnxModel) -> Result<Self> {
        let regressor = Self { model };
        let probe = FeatureVector::from_array([0.0; NUM_FEATURES]);
        regressor
            .score(&probe)
            .map_err(|e| ScoreError::model_load(regressor.model.artifact(), e))?;
        Ok(regressor)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::new(OnnxModel::from_path("regressor", path)?)
    }
}

impl ScoreRegressor for OnnxRegressor {
    fn score(&self, features: &FeatureVector) -> Result<f32> {
        let outputs = self.model.run(features)?;
        read_score(&outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_garbage_bytes_fail_to_load() {
        let result = OnnxModel::from_bytes("classifier", b"not an onnx model");
        match result {
            Err(ScoreError::ModelLoad { artifact, .. }) => assert_eq!(artifact, "classifier"),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("garbage bytes should not load"),
        }
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        let result = OnnxRegressor::load(Path::new("/nonexistent/regressor.onnx"));
        assert!(matches!(result, Err(ScoreError::ModelLoad { .. })));
    }

    fn outputs(tensors: Vec<Tensor>) -> Vec<TValue> {
        tensors.into_iter().map(TValue::from).collect()
    }

    #[test]
    fn test_probabilities_read_from_matching_f32_output() {
        let outs = outputs(vec![tensor1(&[2i64]), tensor2(&[[0.1f32, 0.2, 0.7]])]);
        match read_class_scores(&outs, 3).unwrap() {
            ClassScores::Probabilities(p) => assert_eq!(p, vec![0.1, 0.2, 0.7]),
            other => panic!("expected probabilities, got {:?}", other),
        }
    }

    #[test]
    fn test_label_output_used_when_probabilities_mismatch() {
        let outs = outputs(vec![tensor1(&[1i64]), tensor1(&[0.5f32, 0.5])]);
        assert!(matches!(
            read_class_scores(&outs, 3).unwrap(),
            ClassScores::Index(1)
        ));
    }

    #[test]
    fn test_negative_label_rejected() {
        let outs = outputs(vec![tensor1(&[-1i64])]);
        assert!(matches!(
            read_class_scores(&outs, 3),
            Err(ScoreError::Inference(_))
        ));
    }

    #[test]
    fn test_no_usable_classifier_output() {
        let outs = outputs(vec![tensor1(&[0.5f32, 0.5])]);
        assert!(read_class_scores(&outs, 3).is_err());
        assert!(read_class_scores(&[], 3).is_err());
    }

    #[test]
    fn test_regressor_reads_first_value() {
        let outs = outputs(vec![tensor2(&[[7.5f32], [1.0]]), tensor1(&[3.0f32])]);
        assert_eq!(read_score(&outs).unwrap(), 7.5);
    }

    #[test]
    fn test_regressor_empty_output_rejected() {
        let empty = Tensor::from_shape::<f32>(&[1, 0], &[]).unwrap();
        assert!(read_score(&outputs(vec![empty])).is_err());
        assert!(read_score(&[]).is_err());
    }

    #[test]
    fn test_truncated_file_fails_to_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x08, 0x07, 0x12]).unwrap();
        let result = OnnxClassifier::load(file.path(), 3);
        assert!(matches!(result, Err(ScoreError::ModelLoad { .. })));
    }
}

//! Prediction output formatting and post-processing
//!
//! Maps raw classifier scores onto the configured health labels and attaches
//! the regressor's NutriScore and a confidence value.

use crate::error::{Result, ScoreError};
use crate::models::PredictionResult;

/// Default class labels, in the classifier's class index order
pub const DEFAULT_CLASS_LABELS: [&str; 3] = ["Healthy", "Moderate", "Unhealthy"];

/// Default probability below which a label is reported as low confidence
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Raw classifier output for one row
#[derive(Debug, Clone, PartialEq)]
pub enum ClassScores {
    /// One probability per class label
    Probabilities(Vec<f32>),
    /// Only the winning class index
    Index(usize),
}

impl ClassScores {
    /// Index of the predicted class
    pub fn predicted_index(&self) -> Option<usize> {
        match self {
            ClassScores::Probabilities(p) => p
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i),
            ClassScores::Index(i) => Some(*i),
        }
    }

    /// Probability assigned to a class, if known
    pub fn probability(&self, index: usize) -> Option<f32> {
        match self {
            ClassScores::Probabilities(p) => p.get(index).copied(),
            ClassScores::Index(_) => None,
        }
    }
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Class labels in class index order
    pub class_labels: Vec<String>,
    /// Low confidence threshold
    pub low_confidence_threshold: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            class_labels: DEFAULT_CLASS_LABELS.iter().map(|s| s.to_string()).collect(),
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Formats raw model outputs into a PredictionResult
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self {
            config: OutputConfig::default(),
        }
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn class_labels(&self) -> &[String] {
        &self.config.class_labels
    }

    /// Label for a class index
    pub fn label(&self, index: usize) -> Result<&str> {
        self.config
            .class_labels
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                ScoreError::Inference(format!(
                    "Classifier returned class {} but only {} labels are configured",
                    index,
                    self.config.class_labels.len()
                ))
            })
    }

    /// Format raw model outputs into a PredictionResult
    pub fn format(&self, scores: &ClassScores, nutri_score: f32) -> Result<PredictionResult> {
        if let ClassScores::Probabilities(p) = scores {
            if p.len() != self.config.class_labels.len() {
                return Err(ScoreError::Inference(format!(
                    "Classifier returned {} probabilities, expected {}",
                    p.len(),
                    self.config.class_labels.len()
                )));
            }
        }
        if !nutri_score.is_finite() {
            return Err(ScoreError::Inference(format!(
                "Regressor returned non-finite score {}",
                nutri_score
            )));
        }

        let index = scores
            .predicted_index()
            .ok_or_else(|| ScoreError::Inference("Classifier returned no classes".to_string()))?;

        Ok(PredictionResult {
            health_label: self.label(index)?.to_string(),
            nutri_score,
            confidence: scores.probability(index).map(|p| p.clamp(0.0, 1.0)),
        })
    }

    /// Get the reason for low confidence (if applicable)
    pub fn low_confidence_reason(&self, prediction: &PredictionResult) -> Option<String> {
        let confidence = prediction.confidence?;
        if confidence < self.config.low_confidence_threshold {
            Some(format!(
                "Classifier is only {:.0}% sure of {:?}",
                confidence * 100.0,
                prediction.health_label
            ))
        } else {
            None
        }
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

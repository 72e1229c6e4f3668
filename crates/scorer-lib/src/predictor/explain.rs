//! Per-feature attribution for classifier decisions
//!
//! Each feature is occluded in turn (replaced by a baseline value) and the
//! change in the predicted class's probability is taken as its importance.
//! Classifiers that only report a class index get 1.0 when occluding the
//! feature flips the decision and 0.0 otherwise.

use super::Predictor;
use crate::error::{Result, ScoreError};
use crate::models::{FeatureVector, FEATURE_DISPLAY_NAMES, FEATURE_NAMES, NUM_FEATURES};
use serde::{Deserialize, Serialize};

/// Importance of one feature for the explained decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature: String,
    pub display_name: String,
    pub value: f32,
    pub importance: f32,
}

/// Attribution of a single classifier decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub health_label: String,
    /// One entry per feature, in feature vector order
    pub attributions: Vec<FeatureAttribution>,
}

/// Occlusion explainer over the health classifier
#[derive(Debug, Clone)]
pub struct Explainer {
    baseline: [f32; NUM_FEATURES],
}

impl Default for Explainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Explainer {
    /// Explainer with an all-zero baseline
    pub fn new() -> Self {
        Self {
            baseline: [0.0; NUM_FEATURES],
        }
    }

    pub fn with_baseline(baseline: [f32; NUM_FEATURES]) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> &[f32; NUM_FEATURES] {
        &self.baseline
    }

    pub fn explain(&self, predictor: &Predictor, features: &FeatureVector) -> Result<Explanation> {
        let classifier = predictor.classifier();
        let scores = classifier.class_scores(features)?;
        let class = scores
            .predicted_index()
            .ok_or_else(|| ScoreError::Inference("Classifier returned no classes".to_string()))?;
        let health_label = predictor.formatter().label(class)?.to_string();
        let reference = scores.probability(class);

        let values = features.to_array();
        let mut attributions = Vec::with_capacity(NUM_FEATURES);
        for i in 0..NUM_FEATURES {
            let mut occluded = values;
            occluded[i] = self.baseline[i];

            let importance = if occluded[i] == values[i] {
                0.0
            } else {
                let perturbed = classifier.class_scores(&FeatureVector::from_array(occluded))?;
                match reference {
                    Some(p) => (p - perturbed.probability(class).unwrap_or(0.0)).abs(),
                    None if perturbed.predicted_index() != Some(class) => 1.0,
                    None => 0.0,
                }
            };

            attributions.push(FeatureAttribution {
                feature: FEATURE_NAMES[i].to_string(),
                display_name: FEATURE_DISPLAY_NAMES[i].to_string(),
                value: values[i],
                importance,
            });
        }

        Ok(Explanation {
            health_label,
            attributions,
        })
    }
}

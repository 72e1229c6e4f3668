//! ML prediction engine

mod explain;
mod features;
mod inference;
mod output;

pub use explain::{Explainer, Explanation, FeatureAttribution};
pub use features::{
    count_bad_ingredients, count_ingredients, from_manual, FeatureExtractor, BAD_INGREDIENTS,
    NUTRIENTS,
};
pub use inference::{OnnxClassifier, OnnxModel, OnnxRegressor};
pub use output::{
    ClassScores, OutputConfig, OutputFormatter, DEFAULT_CLASS_LABELS,
    DEFAULT_LOW_CONFIDENCE_THRESHOLD,
};

use crate::error::Result;
use crate::models::{FeatureVector, PredictionResult};
use tracing::debug;

/// Categorical health label model
pub trait HealthClassifier: Send + Sync {
    /// Class scores for a single row
    fn class_scores(&self, features: &FeatureVector) -> Result<ClassScores>;
}

/// Continuous NutriScore model
pub trait ScoreRegressor: Send + Sync {
    /// NutriScore for a single row
    fn score(&self, features: &FeatureVector) -> Result<f32>;
}

/// Runs both models on a feature vector
///
/// One classifier call and one regressor call per request, no caching.
pub struct Predictor {
    classifier: Box<dyn HealthClassifier>,
    regressor: Box<dyn ScoreRegressor>,
    formatter: OutputFormatter,
}

impl Predictor {
    pub fn new(
        classifier: Box<dyn HealthClassifier>,
        regressor: Box<dyn ScoreRegressor>,
        formatter: OutputFormatter,
    ) -> Self {
        Self {
            classifier,
            regressor,
            formatter,
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult> {
        let scores = self.classifier.class_scores(features)?;
        let nutri_score = self.regressor.score(features)?;
        let result = self.formatter.format(&scores, nutri_score)?;

        debug!(
            health_label = %result.health_label,
            nutri_score = result.nutri_score,
            "Prediction completed"
        );
        Ok(result)
    }

    pub fn classifier(&self) -> &dyn HealthClassifier {
        self.classifier.as_ref()
    }

    pub fn formatter(&self) -> &OutputFormatter {
        &self.formatter
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::models::ManualInput;

    #[test]
    fn test_predict_is_deterministic() {
        let predictor = food_predictor();
        let features = from_manual(&ManualInput::default());

        let first = predictor.predict(&features).unwrap();
        let second = predictor.predict(&features).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_manual_vector_reaches_both_models_unchanged() {
        let classifier = LinearClassifier::food();
        let regressor = LinearRegressor::food();
        let classifier_seen = classifier.seen.clone();
        let regressor_seen = regressor.seen.clone();
        let predictor = Predictor::new(
            Box::new(classifier),
            Box::new(regressor),
            OutputFormatter::new(),
        );

        let input = ManualInput {
            energy: 500.0,
            fat: 10.0,
            sugar: 5.0,
            salt: 0.5,
            fiber: 2.5,
            protein: 5.0,
            bad_ingredients: 1,
            additives: 1,
            ingredients_len: 10,
        };
        predictor.predict(&from_manual(&input)).unwrap();

        let expected = [500.0, 10.0, 5.0, 0.5, 2.5, 5.0, 1.0, 1.0, 10.0];
        assert_eq!(classifier_seen.lock().unwrap().as_slice(), &[expected]);
        assert_eq!(regressor_seen.lock().unwrap().as_slice(), &[expected]);
    }

    #[test]
    fn test_sugary_product_labeled_unhealthy() {
        let predictor = food_predictor();
        let features = FeatureVector::from_array([550.0, 30.0, 56.0, 1.0, 0.0, 6.0, 2.0, 2.0, 7.0]);
        let result = predictor.predict(&features).unwrap();
        assert_eq!(result.health_label, "Unhealthy");
        assert!(result.nutri_score > 0.0);
    }
}

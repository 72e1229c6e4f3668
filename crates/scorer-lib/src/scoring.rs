//! Request-level scoring pipeline
//!
//! extract → predict → (explain, suggest). The engine owns the loaded models
//! and the alternatives dataset; every request passes its input explicitly.

use crate::alternatives::{self, Alternative, AlternativesDataset};
use crate::error::{Result, ScoreError};
use crate::models::{DataWarning, Extraction, FeatureVector, InputSource, PredictionResult};
use crate::predictor::{Explainer, Explanation, FeatureExtractor, Predictor};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which alternatives to suggest alongside a score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionConfig {
    pub label: String,
    pub count: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            label: alternatives::DEFAULT_SUGGESTION_LABEL.to_string(),
            count: alternatives::DEFAULT_SUGGESTION_COUNT,
        }
    }
}

/// Non-fatal conditions attached to a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportWarning {
    /// All six nutrient values were zero
    MissingNutrients,
    /// The dataset had too few rows with the suggestion label
    InsufficientAlternatives {
        label: String,
        requested: usize,
        available: usize,
    },
}

impl From<DataWarning> for ReportWarning {
    fn from(warning: DataWarning) -> Self {
        match warning {
            DataWarning::MissingNutrients => ReportWarning::MissingNutrients,
        }
    }
}

impl ReportWarning {
    pub fn message(&self) -> String {
        match self {
            ReportWarning::MissingNutrients => DataWarning::MissingNutrients.message().to_string(),
            ReportWarning::InsufficientAlternatives {
                label,
                requested,
                available,
            } => format!(
                "Only {} alternatives labeled {:?} available, {} requested",
                available, label, requested
            ),
        }
    }
}

/// Everything produced for one scoring request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub features: FeatureVector,
    pub prediction: PredictionResult,
    pub warnings: Vec<ReportWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_confidence_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<Alternative>>,
}

impl ScoreReport {
    pub fn has_missing_nutrients(&self) -> bool {
        self.warnings.contains(&ReportWarning::MissingNutrients)
    }
}

/// Loaded models and dataset shared by all requests
pub struct ScoringEngine {
    extractor: FeatureExtractor,
    predictor: Predictor,
    explainer: Explainer,
    dataset: Arc<AlternativesDataset>,
    suggestion: SuggestionConfig,
}

impl ScoringEngine {
    pub fn new(
        extractor: FeatureExtractor,
        predictor: Predictor,
        explainer: Explainer,
        dataset: Arc<AlternativesDataset>,
        suggestion: SuggestionConfig,
    ) -> Self {
        Self {
            extractor,
            predictor,
            explainer,
            dataset,
            suggestion,
        }
    }

    pub fn suggestion(&self) -> &SuggestionConfig {
        &self.suggestion
    }

    pub fn extract(&self, source: &InputSource) -> Extraction {
        self.extractor.extract(source)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult> {
        self.predictor.predict(features)
    }

    pub fn explain(&self, features: &FeatureVector) -> Result<Explanation> {
        self.explainer.explain(&self.predictor, features)
    }

    /// Draw alternatives, falling back to the configured label and count
    pub fn suggest<R: Rng + ?Sized>(
        &self,
        label: Option<&str>,
        count: Option<usize>,
        rng: &mut R,
    ) -> Result<Vec<Alternative>> {
        alternatives::suggest(
            &self.dataset,
            label.unwrap_or(self.suggestion.label.as_str()),
            count.unwrap_or(self.suggestion.count),
            rng,
        )
    }

    /// Extract and predict
    pub fn score(&self, source: &InputSource) -> Result<ScoreReport> {
        let extraction = self.extract(source);
        let prediction = self.predict(&extraction.features)?;
        let low_confidence_reason = self.predictor.formatter().low_confidence_reason(&prediction);

        Ok(ScoreReport {
            features: extraction.features,
            prediction,
            warnings: extraction.warnings.into_iter().map(ReportWarning::from).collect(),
            low_confidence_reason,
            explanation: None,
            alternatives: None,
        })
    }

    /// Score, explain the decision and suggest alternatives
    ///
    /// Too few alternatives is reported as a warning; the score still stands.
    pub fn score_with_insights<R: Rng + ?Sized>(
        &self,
        source: &InputSource,
        rng: &mut R,
    ) -> Result<ScoreReport> {
        let mut report = self.score(source)?;
        report.explanation = Some(self.explain(&report.features)?);

        match self.suggest(None, None, rng) {
            Ok(rows) => report.alternatives = Some(rows),
            Err(ScoreError::Underflow {
                label,
                requested,
                available,
            }) => {
                report.alternatives = Some(Vec::new());
                report.warnings.push(ReportWarning::InsufficientAlternatives {
                    label,
                    requested,
                    available,
                });
            }
            Err(e) => return Err(e),
        }
        Ok(report)
    }
}

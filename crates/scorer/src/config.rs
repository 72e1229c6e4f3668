//! Service configuration
//!
//! Read from an optional TOML file (`SCORER_CONFIG`, default `scorer.toml`)
//! with `SCORER_*` environment variables layered on top. Nested keys use a
//! double underscore, e.g. `SCORER_CLASSIFIER__PATH`.

use anyhow::{bail, Context, Result};
use scorer_lib::alternatives::{DEFAULT_SUGGESTION_COUNT, DEFAULT_SUGGESTION_LABEL};
use scorer_lib::artifacts::ArtifactSource;
use scorer_lib::lookup::{LookupConfig, DEFAULT_OPENFOODFACTS_URL};
use scorer_lib::predictor::{
    Explainer, FeatureExtractor, OutputConfig, DEFAULT_CLASS_LABELS,
    DEFAULT_LOW_CONFIDENCE_THRESHOLD,
};
use scorer_lib::{IngredientCountPolicy, SuggestionConfig, NUM_FEATURES};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when `SCORER_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "scorer.toml";

/// Food scorer service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScorerConfig {
    /// Service name attached to structured log records
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// HTTP port for the scoring API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Health label classifier artifact
    #[serde(default = "default_classifier")]
    pub classifier: ArtifactSource,

    /// NutriScore regressor artifact
    #[serde(default = "default_regressor")]
    pub regressor: ArtifactSource,

    /// Timeout for artifact downloads in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Labeled dataset used for alternative suggestions
    #[serde(default = "default_alternatives_path")]
    pub alternatives_path: PathBuf,

    /// Classifier labels in class index order
    #[serde(default = "default_class_labels")]
    pub class_labels: Vec<String>,

    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f32,

    #[serde(default)]
    pub ingredient_count_policy: IngredientCountPolicy,

    #[serde(default = "default_suggestion_label")]
    pub suggestion_label: String,

    #[serde(default = "default_suggestion_count")]
    pub suggestion_count: usize,

    /// OpenFoodFacts base URL
    #[serde(default = "default_lookup_base_url")]
    pub lookup_base_url: String,

    /// Product lookup timeout in seconds
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    /// Occlusion baseline for explanations, zeros when unset
    #[serde(default)]
    pub explain_baseline: Option<Vec<f32>>,
}

fn default_service_name() -> String {
    "food-scorer".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_classifier() -> ArtifactSource {
    ArtifactSource::local("models/classifier.onnx")
}

fn default_regressor() -> ArtifactSource {
    ArtifactSource::local("models/regressor.onnx")
}

fn default_download_timeout() -> u64 {
    300
}

fn default_alternatives_path() -> PathBuf {
    PathBuf::from("data/engineered_food_data.csv")
}

fn default_class_labels() -> Vec<String> {
    DEFAULT_CLASS_LABELS.iter().map(|s| s.to_string()).collect()
}

fn default_low_confidence_threshold() -> f32 {
    DEFAULT_LOW_CONFIDENCE_THRESHOLD
}

fn default_suggestion_label() -> String {
    DEFAULT_SUGGESTION_LABEL.to_string()
}

fn default_suggestion_count() -> usize {
    DEFAULT_SUGGESTION_COUNT
}

fn default_lookup_base_url() -> String {
    DEFAULT_OPENFOODFACTS_URL.to_string()
}

fn default_lookup_timeout() -> u64 {
    10
}

impl ScorerConfig {
    /// Load configuration from the config file and process environment
    pub fn load() -> Result<Self> {
        let file = std::env::var("SCORER_CONFIG").ok().map(PathBuf::from);
        Self::from_sources(file.as_deref(), Self::environment())
    }

    /// Environment source for `SCORER_*` variables
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix("SCORER")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("class_labels")
            .with_list_parse_key("explain_baseline")
            .try_parsing(true)
    }

    /// Build from an explicit file (required) or the default file (optional)
    pub fn from_sources(file: Option<&Path>, env: config::Environment) -> Result<Self> {
        let builder = match file {
            Some(path) => config::Config::builder().add_source(config::File::from(path).required(true)),
            None => config::Config::builder()
                .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let config: ScorerConfig = builder
            .add_source(env)
            .build()
            .context("failed to read scorer configuration")?
            .try_deserialize()
            .context("failed to parse scorer configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.class_labels.is_empty() {
            bail!("class_labels must not be empty");
        }
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            bail!(
                "low_confidence_threshold must be within [0, 1], got {}",
                self.low_confidence_threshold
            );
        }
        if self.suggestion_count == 0 {
            bail!("suggestion_count must be at least 1");
        }
        if let Some(baseline) = &self.explain_baseline {
            if baseline.len() != NUM_FEATURES {
                bail!(
                    "explain_baseline needs {} values, got {}",
                    NUM_FEATURES,
                    baseline.len()
                );
            }
        }
        Ok(())
    }

    pub fn lookup_config(&self) -> LookupConfig {
        LookupConfig {
            base_url: self.lookup_base_url.clone(),
            timeout: Duration::from_secs(self.lookup_timeout_secs),
            ..LookupConfig::default()
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            class_labels: self.class_labels.clone(),
            low_confidence_threshold: self.low_confidence_threshold,
        }
    }

    pub fn suggestion(&self) -> SuggestionConfig {
        SuggestionConfig {
            label: self.suggestion_label.clone(),
            count: self.suggestion_count,
        }
    }

    pub fn extractor(&self) -> FeatureExtractor {
        FeatureExtractor::with_policy(self.ingredient_count_policy)
    }

    pub fn explainer(&self) -> Result<Explainer> {
        match &self.explain_baseline {
            None => Ok(Explainer::new()),
            Some(values) => {
                let baseline: [f32; NUM_FEATURES] = values
                    .as_slice()
                    .try_into()
                    .context("explain_baseline has the wrong length")?;
                Ok(Explainer::with_baseline(baseline))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScorerConfig::environment().source(Some(source))
    }

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let file = toml_file("");
        let config = ScorerConfig::from_sources(Some(file.path()), env(&[])).unwrap();

        assert_eq!(config.api_port, 8080);
        assert_eq!(config.classifier.path, PathBuf::from("models/classifier.onnx"));
        assert_eq!(config.class_labels, vec!["Healthy", "Moderate", "Unhealthy"]);
        assert_eq!(config.low_confidence_threshold, 0.6);
        assert_eq!(config.ingredient_count_policy, IngredientCountPolicy::LiteralSplit);
        assert_eq!(config.suggestion(), SuggestionConfig::default());
        assert_eq!(config.lookup_config().timeout, Duration::from_secs(10));
        assert!(config.explain_baseline.is_none());
    }

    #[test]
    fn test_file_values() {
        let file = toml_file(
            r#"
api_port = 9000
ingredient_count_policy = "non_empty_segments"
suggestion_count = 5

[classifier]
path = "/srv/models/classifier.onnx"
url = "https://models.example.com/classifier.onnx"
sha256 = "abc123"
"#,
        );
        let config = ScorerConfig::from_sources(Some(file.path()), env(&[])).unwrap();

        assert_eq!(config.api_port, 9000);
        assert_eq!(
            config.ingredient_count_policy,
            IngredientCountPolicy::NonEmptySegments
        );
        assert_eq!(config.suggestion_count, 5);
        assert_eq!(config.classifier.sha256.as_deref(), Some("abc123"));
        assert_eq!(config.regressor.path, PathBuf::from("models/regressor.onnx"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("api_port = 9000\n");
        let config = ScorerConfig::from_sources(
            Some(file.path()),
            env(&[
                ("SCORER_API_PORT", "9191"),
                ("SCORER_REGRESSOR__PATH", "/tmp/regressor.onnx"),
                ("SCORER_CLASS_LABELS", "Good,Bad"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api_port, 9191);
        assert_eq!(config.regressor.path, PathBuf::from("/tmp/regressor.onnx"));
        assert_eq!(config.class_labels, vec!["Good", "Bad"]);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = ScorerConfig::from_sources(Some(Path::new("/nonexistent/scorer.toml")), env(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_baseline_length_checked() {
        let file = toml_file("explain_baseline = [1.0, 2.0]\n");
        let err = ScorerConfig::from_sources(Some(file.path()), env(&[])).unwrap_err();
        assert!(err.to_string().contains("explain_baseline"));

        let file = toml_file("explain_baseline = [0, 0, 0, 0, 0, 0, 1, 1, 1]\n");
        let config = ScorerConfig::from_sources(Some(file.path()), env(&[])).unwrap();
        let explainer = config.explainer().unwrap();
        assert_eq!(explainer.baseline()[6], 1.0);
    }

    #[test]
    fn test_empty_labels_rejected() {
        let file = toml_file("class_labels = []\n");
        assert!(ScorerConfig::from_sources(Some(file.path()), env(&[])).is_err());
    }
}

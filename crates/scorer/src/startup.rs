//! Startup loading of models and the alternatives dataset
//!
//! Any failure here is fatal: the service never binds its port without both
//! models and the dataset.

use crate::config::ScorerConfig;
use anyhow::{Context, Result};
use scorer_lib::alternatives::AlternativesDataset;
use scorer_lib::artifacts::{ArtifactStore, LoadedArtifact};
use scorer_lib::health::components;
use scorer_lib::predictor::{OnnxClassifier, OnnxRegressor, OutputFormatter, Predictor};
use scorer_lib::{HealthRegistry, ScorerMetrics, ScoringEngine, StructuredLogger};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Fetch, verify and load both models and the dataset into a ScoringEngine
pub async fn build_engine(
    config: &ScorerConfig,
    health: &HealthRegistry,
    metrics: &ScorerMetrics,
    logger: &StructuredLogger,
) -> Result<ScoringEngine> {
    let store = ArtifactStore::new(Duration::from_secs(config.download_timeout_secs))?;

    let artifact = store
        .ensure_local(components::CLASSIFIER, &config.classifier)
        .await
        .context("classifier artifact unavailable")?;
    let classifier = OnnxClassifier::load(&artifact.path, config.class_labels.len())
        .context("failed to load classifier")?;
    record_artifact(&artifact, health, metrics, logger).await;

    let artifact = store
        .ensure_local(components::REGRESSOR, &config.regressor)
        .await
        .context("regressor artifact unavailable")?;
    let regressor = OnnxRegressor::load(&artifact.path).context("failed to load regressor")?;
    record_artifact(&artifact, health, metrics, logger).await;

    let dataset = load_dataset(config, health).await?;

    let predictor = Predictor::new(
        Box::new(classifier),
        Box::new(regressor),
        OutputFormatter::with_config(config.output_config()),
    );

    Ok(ScoringEngine::new(
        config.extractor(),
        predictor,
        config.explainer()?,
        Arc::new(dataset),
        config.suggestion(),
    ))
}

/// Load the alternatives CSV and report how many suggestion candidates it has
pub async fn load_dataset(config: &ScorerConfig, health: &HealthRegistry) -> Result<AlternativesDataset> {
    let dataset = AlternativesDataset::from_path(&config.alternatives_path)
        .context("failed to load alternatives dataset")?;

    let candidates = dataset.with_label(&config.suggestion_label).count();
    if candidates < config.suggestion_count {
        warn!(
            label = %config.suggestion_label,
            available = candidates,
            requested = config.suggestion_count,
            "Alternatives dataset cannot satisfy default suggestion count"
        );
    }

    health
        .mark_loaded(
            components::ALTERNATIVES,
            format!("{} rows, {} labeled {}", dataset.len(), candidates, config.suggestion_label),
        )
        .await;
    info!(rows = dataset.len(), candidates = candidates, "Alternatives dataset loaded");

    Ok(dataset)
}

async fn record_artifact(
    artifact: &LoadedArtifact,
    health: &HealthRegistry,
    metrics: &ScorerMetrics,
    logger: &StructuredLogger,
) {
    metrics.set_model_info(&artifact.name, &artifact.checksum);
    logger.log_model_loaded(
        &artifact.name,
        &artifact.checksum,
        artifact.size_bytes,
        artifact.downloaded,
    );
    health
        .mark_loaded(&artifact.name, format!("sha256 {}", artifact.checksum))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorer_lib::artifacts::ArtifactSource;
    use scorer_lib::ComponentStatus;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> ScorerConfig {
        let mut config = ScorerConfig::from_sources(
            None,
            ScorerConfig::environment().source(Some(Default::default())),
        )
        .unwrap();
        config.classifier = ArtifactSource::local(dir.path().join("classifier.onnx"));
        config.regressor = ArtifactSource::local(dir.path().join("regressor.onnx"));
        config.alternatives_path = dir.path().join("alternatives.csv");
        config
    }

    #[tokio::test]
    async fn test_missing_classifier_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let health = HealthRegistry::new();

        let result = build_engine(
            &config,
            &health,
            &ScorerMetrics::new(),
            &StructuredLogger::new("test"),
        )
        .await;

        let err = match result {
            Ok(_) => panic!("engine built without a classifier"),
            Err(e) => e,
        };
        assert!(format!("{:#}", err).contains("classifier"));
        assert!(health.health().await.components.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_classifier_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(&config.classifier.path, b"not an onnx model").unwrap();

        let result = build_engine(
            &config,
            &HealthRegistry::new(),
            &ScorerMetrics::new(),
            &StructuredLogger::new("test"),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_dataset_marks_component() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(
            &config.alternatives_path,
            "product_name,nutriscore_score,health_label,extra\nOats,-4,Healthy,x\nCola,15,Unhealthy,y\n",
        )
        .unwrap();
        let health = HealthRegistry::new();

        let dataset = load_dataset(&config, &health).await.unwrap();
        assert_eq!(dataset.len(), 2);

        let response = health.health().await;
        let component = &response.components[components::ALTERNATIVES];
        assert_eq!(component.status, ComponentStatus::Healthy);
        assert_eq!(component.message.as_deref(), Some("2 rows, 1 labeled Healthy"));
    }

    #[tokio::test]
    async fn test_missing_dataset_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        assert!(load_dataset(&config, &HealthRegistry::new()).await.is_err());
    }
}

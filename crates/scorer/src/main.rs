//! Food Scorer - product healthiness scoring service
//!
//! Loads the classifier, the regressor and the alternatives dataset at
//! startup, then serves scoring, health and metrics endpoints over HTTP.

use anyhow::{Context, Result};
use food_scorer::{api, config::ScorerConfig, startup};
use scorer_lib::{
    health::components,
    lookup::OpenFoodFactsClient,
    HealthRegistry, ScorerMetrics, StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SCORER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting food-scorer");

    let config = ScorerConfig::load()?;
    info!(
        port = config.api_port,
        alternatives = %config.alternatives_path.display(),
        "Scorer configured"
    );

    let health_registry = HealthRegistry::new();
    let metrics = ScorerMetrics::new();
    let logger = StructuredLogger::new(&config.service_name);

    let engine = match startup::build_engine(&config, &health_registry, &metrics, &logger).await {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Startup loading failed");
            return Err(e);
        }
    };

    let lookup = OpenFoodFactsClient::new(config.lookup_config())
        .context("failed to create product lookup client")?;
    health_registry.set_healthy(components::PRODUCT_LOOKUP).await;

    let app_state = Arc::new(api::AppState::new(
        Arc::new(engine),
        Arc::new(lookup),
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    // Models and dataset are in memory; start taking traffic
    health_registry.set_loaded(true).await;
    logger.log_startup(SCORER_VERSION, config.api_port);

    let server = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = server => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("server stopped"),
                Ok(Err(e)) => {
                    logger.log_shutdown("server error");
                    return Err(e);
                }
                Err(e) => return Err(e).context("server task panicked"),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}

//! HTTP API for scoring, health checks and Prometheus metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use scorer_lib::alternatives::Alternative;
use scorer_lib::lookup::{validate_barcode, ProductLookup};
use scorer_lib::{
    ComponentStatus, HealthRegistry, InputSource, ManualInput, ProductRecord, ReportWarning,
    ScoreError, ScoreReport, ScorerMetrics, ScoringEngine, StructuredLogger,
    FEATURE_DISPLAY_NAMES, FEATURE_NAMES,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
    pub lookup: Arc<dyn ProductLookup>,
    pub health_registry: HealthRegistry,
    pub metrics: ScorerMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        engine: Arc<ScoringEngine>,
        lookup: Arc<dyn ProductLookup>,
        health_registry: HealthRegistry,
        metrics: ScorerMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            engine,
            lookup,
            health_registry,
            metrics,
            logger,
        }
    }

    /// Run one scoring request and record its metrics and log events
    pub fn score(
        &self,
        source: &InputSource,
        source_name: &str,
        with_insights: bool,
    ) -> Result<ScoreReport, ScoreError> {
        let start = Instant::now();
        let result = if with_insights {
            let mut rng = rand::thread_rng();
            self.engine.score_with_insights(source, &mut rng)
        } else {
            self.engine.score(source)
        };
        let elapsed = start.elapsed();

        match &result {
            Ok(report) => {
                let prediction = &report.prediction;
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions(source_name, &prediction.health_label);
                self.logger.log_prediction(
                    source_name,
                    &prediction.health_label,
                    prediction.nutri_score,
                    prediction.confidence,
                    elapsed.as_micros(),
                );

                if report.has_missing_nutrients() {
                    self.metrics.inc_missing_nutrient_warnings();
                    self.logger.log_missing_nutrients(source_name);
                }
                if report
                    .warnings
                    .iter()
                    .any(|w| matches!(w, ReportWarning::InsufficientAlternatives { .. }))
                {
                    self.metrics.inc_suggestion_underflows();
                }
            }
            Err(e) => {
                self.metrics.inc_prediction_errors();
                error!(source = %source_name, error = %e, "Prediction failed");
            }
        }
        result
    }

    /// Look up a product, tracking the lookup dependency's health
    pub async fn lookup_product(&self, barcode: &str) -> Result<ProductRecord, ScoreError> {
        let start = Instant::now();
        let result = self.lookup.lookup(barcode).await;
        let elapsed = start.elapsed();

        let outcome = match &result {
            Ok(Some(_)) => "found",
            Ok(None) => "not_found",
            Err(_) => "transport_error",
        };
        self.metrics.observe_lookup_latency(elapsed.as_secs_f64());
        self.metrics.inc_lookups(outcome);
        self.logger.log_lookup(barcode, outcome, elapsed.as_millis());

        match result {
            Ok(Some(product)) => {
                self.health_registry.record_lookup(None).await;
                Ok(product)
            }
            Ok(None) => {
                self.health_registry.record_lookup(None).await;
                Err(ScoreError::LookupNotFound {
                    barcode: barcode.to_string(),
                })
            }
            Err(e) => {
                if let ScoreError::LookupTransport(message) = &e {
                    self.health_registry.record_lookup(Some(message)).await;
                }
                Err(e)
            }
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// A ScoreError rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub ScoreError);

impl From<ScoreError> for ApiError {
    fn from(err: ScoreError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind
pub fn status_for(err: &ScoreError) -> StatusCode {
    match err {
        ScoreError::InvalidInput(_) | ScoreError::InvalidBarcode(_) => StatusCode::BAD_REQUEST,
        ScoreError::LookupNotFound { .. } => StatusCode::NOT_FOUND,
        ScoreError::LookupTransport(_) => StatusCode::BAD_GATEWAY,
        ScoreError::Underflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ScoreError::ModelLoad { .. } | ScoreError::Inference(_) | ScoreError::Dataset(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

/// Product summary returned with a barcode score
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductScoreResponse {
    pub barcode: String,
    pub product: ProductSummary,
    pub report: ScoreReport,
}

#[derive(Debug, Deserialize)]
pub struct AlternativesQuery {
    pub label: Option<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlternativesResponse {
    pub label: String,
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureInfo {
    pub name: String,
    pub display_name: String,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Manual scoring still works
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Score a manual form submission with explanation and alternatives
async fn score_manual(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ManualInput>,
) -> Result<Json<ScoreReport>, ApiError> {
    input.validate()?;
    let report = state.score(&InputSource::Manual(input), "manual", true)?;
    Ok(Json(report))
}

/// Look up a product by barcode and score it
async fn score_barcode(
    State(state): State<Arc<AppState>>,
    Path(barcode): Path<String>,
) -> Result<Json<ProductScoreResponse>, ApiError> {
    validate_barcode(&barcode)?;
    let product = state.lookup_product(&barcode).await?;

    let summary = ProductSummary {
        name: product.display_name().to_string(),
        image_url: product.image_url.clone(),
    };
    let report = state.score(&InputSource::Product(product), "product", false)?;

    Ok(Json(ProductScoreResponse {
        barcode,
        product: summary,
        report,
    }))
}

/// Sample rows from the alternatives dataset
async fn alternatives(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlternativesQuery>,
) -> Result<Json<AlternativesResponse>, ApiError> {
    let label = query
        .label
        .unwrap_or_else(|| state.engine.suggestion().label.clone());

    let result = {
        let mut rng = rand::thread_rng();
        state.engine.suggest(Some(&label), query.count, &mut rng)
    };
    if let Err(ScoreError::Underflow { .. }) = &result {
        state.metrics.inc_suggestion_underflows();
    }

    Ok(Json(AlternativesResponse {
        label,
        alternatives: result?,
    }))
}

/// Feature names in model input order
async fn features() -> Json<Vec<FeatureInfo>> {
    Json(
        FEATURE_NAMES
            .iter()
            .zip(FEATURE_DISPLAY_NAMES.iter())
            .map(|(name, display_name)| FeatureInfo {
                name: name.to_string(),
                display_name: display_name.to_string(),
            })
            .collect(),
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/score", post(score_manual))
        .route("/api/v1/products/:barcode", get(score_barcode))
        .route("/api/v1/alternatives", get(alternatives))
        .route("/api/v1/features", get(features))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

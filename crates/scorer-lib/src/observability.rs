//! Observability infrastructure for the scoring service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, lookup latency, warning and error counters, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for model latency (in seconds)
const PREDICTION_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Histogram buckets for OpenFoodFacts round trips (in seconds)
const LOOKUP_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ScorerMetricsInner> = OnceLock::new();

struct ScorerMetricsInner {
    prediction_latency_seconds: Histogram,
    lookup_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    lookups_total: IntCounterVec,
    missing_nutrient_warnings: IntCounter,
    suggestion_underflows: IntCounter,
    prediction_errors: IntCounter,
    model_info: GaugeVec,
}

impl ScorerMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "food_scorer_prediction_latency_seconds",
                "Time spent extracting features and running both models",
                PREDICTION_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            lookup_latency_seconds: register_histogram!(
                "food_scorer_lookup_latency_seconds",
                "Time spent waiting on OpenFoodFacts product lookups",
                LOOKUP_BUCKETS.to_vec()
            )
            .expect("Failed to register lookup_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "food_scorer_predictions_total",
                "Predictions generated, by input source and health label",
                &["source", "health_label"]
            )
            .expect("Failed to register predictions_total"),

            lookups_total: register_int_counter_vec!(
                "food_scorer_lookups_total",
                "Product lookups, by outcome (found, not_found, transport_error)",
                &["outcome"]
            )
            .expect("Failed to register lookups_total"),

            missing_nutrient_warnings: register_int_counter!(
                "food_scorer_missing_nutrient_warnings_total",
                "Predictions made on inputs whose nutrients were all zero"
            )
            .expect("Failed to register missing_nutrient_warnings"),

            suggestion_underflows: register_int_counter!(
                "food_scorer_suggestion_underflows_total",
                "Suggestion requests with fewer candidates than requested"
            )
            .expect("Failed to register suggestion_underflows"),

            prediction_errors: register_int_counter!(
                "food_scorer_prediction_errors_total",
                "Total number of failed model runs"
            )
            .expect("Failed to register prediction_errors"),

            model_info: register_gauge_vec!(
                "food_scorer_model_info",
                "Information about the loaded model artifacts",
                &["artifact", "checksum"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ScorerMetrics {
    _private: (),
}

impl Default for ScorerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScorerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ScorerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ScorerMetricsInner {
        GLOBAL_METRICS.get_or_init(ScorerMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_lookup_latency(&self, duration_secs: f64) {
        self.inner().lookup_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, source: &str, health_label: &str) {
        self.inner()
            .predictions_total
            .with_label_values(&[source, health_label])
            .inc();
    }

    pub fn inc_lookups(&self, outcome: &str) {
        self.inner().lookups_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_missing_nutrient_warnings(&self) {
        self.inner().missing_nutrient_warnings.inc();
    }

    pub fn inc_suggestion_underflows(&self) {
        self.inner().suggestion_underflows.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    /// Publish the checksum of a loaded artifact
    pub fn set_model_info(&self, artifact: &str, checksum: &str) {
        self.inner()
            .model_info
            .with_label_values(&[artifact, checksum])
            .set(1.0);
    }
}

/// Structured logger for scoring events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log a prediction generation event
    pub fn log_prediction(
        &self,
        source: &str,
        health_label: &str,
        nutri_score: f32,
        confidence: Option<f32>,
        elapsed_us: u128,
    ) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            source = %source,
            health_label = %health_label,
            nutri_score = nutri_score,
            confidence = ?confidence,
            elapsed_us = elapsed_us as u64,
            "Generated health prediction"
        );
    }

    /// Log a product lookup outcome
    pub fn log_lookup(&self, barcode: &str, outcome: &str, elapsed_ms: u128) {
        if outcome == "transport_error" {
            warn!(
                event = "product_lookup",
                service = %self.service,
                barcode = %barcode,
                outcome = %outcome,
                elapsed_ms = elapsed_ms as u64,
                "Product lookup failed"
            );
        } else {
            info!(
                event = "product_lookup",
                service = %self.service,
                barcode = %barcode,
                outcome = %outcome,
                elapsed_ms = elapsed_ms as u64,
                "Product lookup completed"
            );
        }
    }

    /// Log an input whose nutrients were all zero
    pub fn log_missing_nutrients(&self, source: &str) {
        warn!(
            event = "missing_nutrients",
            service = %self.service,
            source = %source,
            "Nutrition info missing, prediction may be inaccurate"
        );
    }

    pub fn log_model_loaded(&self, artifact: &str, checksum: &str, size_bytes: usize, downloaded: bool) {
        info!(
            event = "model_loaded",
            service = %self.service,
            artifact = %artifact,
            checksum = %checksum,
            size_bytes = size_bytes,
            downloaded = downloaded,
            "Model artifact loaded"
        );
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            port = port,
            "Food scorer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Food scorer shutting down"
        );
    }
}

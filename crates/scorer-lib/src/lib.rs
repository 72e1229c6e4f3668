//! Core library for food healthiness scoring
//!
//! This crate provides the core functionality for:
//! - Feature extraction from product records and manual input
//! - Health label classification and NutriScore regression
//! - Per-feature attribution of classifier decisions
//! - Healthier alternative suggestions
//! - Product lookup against OpenFoodFacts
//! - Health checks and observability

pub mod alternatives;
pub mod artifacts;
pub mod error;
pub mod health;
pub mod lookup;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod scoring;

pub use error::{Result, ScoreError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ScorerMetrics, StructuredLogger};
pub use scoring::{ReportWarning, ScoreReport, ScoringEngine, SuggestionConfig};

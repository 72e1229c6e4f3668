//! Food scorer HTTP service
//!
//! Wires the scoring core into an axum server: configuration, startup
//! loading of models and dataset, request handlers, health and metrics.

pub mod api;
pub mod config;
pub mod startup;

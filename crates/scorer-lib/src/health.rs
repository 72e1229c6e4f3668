//! Health check infrastructure for the scoring service
//!
//! Tracks the models, the alternatives dataset and the product lookup
//! dependency for liveness and readiness probes. Models and the dataset are
//! loaded once; the lookup dependency flips between healthy and degraded as
//! OpenFoodFacts answers or fails.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but scoring still works
    Degraded,
    /// Component has failed
    Unhealthy,
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .max_by_key(|status| match status {
                ComponentStatus::Healthy => 0,
                ComponentStatus::Degraded => 1,
                ComponentStatus::Unhealthy => 2,
            })
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const CLASSIFIER: &str = "classifier";
    pub const REGRESSOR: &str = "regressor";
    pub const ALTERNATIVES: &str = "alternatives";
    pub const PRODUCT_LOOKUP: &str = "product_lookup";
}

/// Health registry for tracking component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    loaded: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a component that finished loading, with a detail message
    pub async fn mark_loaded(&self, name: &str, detail: impl Into<String>) {
        let mut health = ComponentHealth::healthy();
        health.message = Some(detail.into());
        self.update(name, health).await;
    }

    /// Update component health status
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Record the outcome of a product lookup
    ///
    /// Transport failures degrade the lookup component; any answer from the
    /// database, including "not found", restores it.
    pub async fn record_lookup(&self, transport_error: Option<&str>) {
        match transport_error {
            Some(message) => self.set_degraded(components::PRODUCT_LOOKUP, message).await,
            None => self.set_healthy(components::PRODUCT_LOOKUP).await,
        }
    }

    /// Mark startup loading as finished
    pub async fn set_loaded(&self, loaded: bool) {
        *self.loaded.write().await = loaded;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Ready once loading finished and nothing is unhealthy
    ///
    /// A degraded lookup keeps the service ready: manual scoring still works.
    pub async fn readiness(&self) -> ReadinessResponse {
        let loaded = *self.loaded.read().await;
        let health = self.health().await;

        let reason = if !loaded {
            Some("Models and dataset not yet loaded".to_string())
        } else if health.status == ComponentStatus::Unhealthy {
            let failed: Vec<_> = health
                .components
                .iter()
                .filter(|(_, c)| c.status == ComponentStatus::Unhealthy)
                .map(|(name, _)| name.as_str())
                .collect();
            Some(format!("Unhealthy components: {}", failed.join(", ")))
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy_but_not_ready() {
        let registry = HealthRegistry::new();
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.unwrap().contains("not yet loaded"));
    }

    #[tokio::test]
    async fn test_loaded_components_ready() {
        let registry = HealthRegistry::new();
        registry.mark_loaded(components::CLASSIFIER, "sha256 abc").await;
        registry.mark_loaded(components::REGRESSOR, "sha256 def").await;
        registry.mark_loaded(components::ALTERNATIVES, "120 rows").await;
        registry.set_loaded(true).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(
            health.components[components::ALTERNATIVES].message.as_deref(),
            Some("120 rows")
        );
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_but_stays_ready() {
        let registry = HealthRegistry::new();
        registry.mark_loaded(components::CLASSIFIER, "ok").await;
        registry.set_loaded(true).await;

        registry.record_lookup(Some("connection refused")).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
        assert!(registry.readiness().await.ready);

        registry.record_lookup(None).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_unhealthy_component_blocks_readiness() {
        let registry = HealthRegistry::new();
        registry.mark_loaded(components::CLASSIFIER, "ok").await;
        registry.set_loaded(true).await;
        registry.set_unhealthy(components::REGRESSOR, "inference failing").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.unwrap().contains(components::REGRESSOR));
    }
}

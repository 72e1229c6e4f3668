//! Product lookup against the OpenFoodFacts database
//!
//! A lookup has three outcomes: found (`Ok(Some)`), not found (`Ok(None)`)
//! and transport failure (`Err(LookupTransport)`).

use crate::error::{Result, ScoreError};
use crate::models::ProductRecord;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Public OpenFoodFacts endpoint
pub const DEFAULT_OPENFOODFACTS_URL: &str = "https://world.openfoodfacts.org";

/// Source of product records by barcode
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<Option<ProductRecord>>;
}

/// Configuration for the OpenFoodFacts client
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Base URL of the OpenFoodFacts instance
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENFOODFACTS_URL.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("food-healthiness-scorer/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Envelope of `/api/v0/product/{barcode}.json`
#[derive(Debug, Deserialize)]
struct ProductEnvelope {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    product: Option<ProductRecord>,
}

/// HTTP client for the OpenFoodFacts product API
pub struct OpenFoodFactsClient {
    client: Client,
    base_url: Url,
}

impl OpenFoodFactsClient {
    pub fn new(config: LookupConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| ScoreError::LookupTransport(format!("failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ScoreError::LookupTransport(format!("invalid base URL: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn product_url(&self, barcode: &str) -> Result<Url> {
        self.base_url
            .join(&format!("api/v0/product/{}.json", barcode))
            .map_err(|e| ScoreError::LookupTransport(format!("invalid product URL: {}", e)))
    }
}

/// Barcodes are non-empty digit strings
pub fn validate_barcode(barcode: &str) -> Result<()> {
    if barcode.is_empty() || !barcode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScoreError::InvalidBarcode(barcode.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> Result<Option<ProductRecord>> {
        validate_barcode(barcode)?;
        let url = self.product_url(barcode)?;
        let start = Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(barcode = %barcode, error = %e, "Product lookup request failed");
            ScoreError::LookupTransport(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(barcode = %barcode, "Product not found (HTTP 404)");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ScoreError::LookupTransport(format!(
                "OpenFoodFacts returned {}",
                status
            )));
        }

        let envelope: ProductEnvelope = response
            .json()
            .await
            .map_err(|e| ScoreError::LookupTransport(format!("failed to parse response: {}", e)))?;

        debug!(
            barcode = %barcode,
            status = envelope.status,
            elapsed_ms = start.elapsed().as_millis(),
            "Product lookup completed"
        );

        if envelope.status != 1 {
            return Ok(None);
        }
        Ok(Some(envelope.product.unwrap_or_default()))
    }
}

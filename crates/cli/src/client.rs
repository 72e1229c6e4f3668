//! API client for communicating with the food scorer service

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Non-success answer from the service
#[derive(Debug, Error)]
#[error("{message} (HTTP {status}{})", format_code(.code))]
pub struct ApiError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
}

fn format_code(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(", {}", c)).unwrap_or_default()
}

impl ApiError {
    async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(error) => Self {
                status: status.as_u16(),
                code: error.code,
                message: error.error,
            },
            Err(_) => Self {
                status: status.as_u16(),
                code: None,
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
            },
        }
    }
}

/// API client for the food scorer service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_with_query(path, &[]).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await.into());
        }

        response.json().await.context("Failed to parse response")
    }

    /// GET that also accepts a 503 body, as health probes answer with one
    pub async fn get_probe<T: DeserializeOwned>(&self, path: &str) -> Result<(u16, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            return Err(ApiError::from_response(response).await.into());
        }

        let body = response.json().await.context("Failed to parse response")?;
        Ok((status.as_u16(), body))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await.into());
        }

        response.json().await.context("Failed to parse response")
    }
}

// API request and response types

/// Manual nutrition form, per 100g
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualRequest {
    pub energy: f32,
    pub fat: f32,
    pub sugar: f32,
    pub salt: f32,
    pub fiber: f32,
    pub protein: f32,
    pub bad_ingredients: u32,
    pub additives: u32,
    pub ingredients_len: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Features {
    pub energy_kcal: f32,
    pub fat: f32,
    pub sugars: f32,
    pub salt: f32,
    pub fiber: f32,
    pub proteins: f32,
    pub bad_ingredient_count: f32,
    pub additive_count: f32,
    pub ingredient_count: f32,
}

impl Features {
    /// (display name, value) in model input order, labeled as in explanations
    pub fn rows(&self) -> Vec<(&'static str, f32)> {
        vec![
            ("Energy (kcal per 100g)", self.energy_kcal),
            ("Fat (g per 100g)", self.fat),
            ("Sugars (g per 100g)", self.sugars),
            ("Salt (g per 100g)", self.salt),
            ("Fiber (g per 100g)", self.fiber),
            ("Proteins (g per 100g)", self.proteins),
            ("Bad Ingredient Count", self.bad_ingredient_count),
            ("Additives Count", self.additive_count),
            ("Ingredients Length", self.ingredient_count),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub health_label: String,
    pub nutri_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportWarning {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<usize>,
}

impl ReportWarning {
    pub fn message(&self) -> String {
        match self.kind.as_str() {
            "missing_nutrients" => {
                "Nutrition info missing, prediction may be inaccurate".to_string()
            }
            "insufficient_alternatives" => format!(
                "Only {} alternatives labeled {} available, {} requested",
                self.available.unwrap_or(0),
                self.label.as_deref().unwrap_or("?"),
                self.requested.unwrap_or(0)
            ),
            other => other.replace('_', " "),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub feature: String,
    pub display_name: String,
    pub value: f32,
    pub importance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub health_label: String,
    pub attributions: Vec<Attribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub product_name: String,
    pub nutriscore_score: Option<f32>,
    pub health_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub features: Features,
    pub prediction: Prediction,
    #[serde(default)]
    pub warnings: Vec<ReportWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_confidence_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<Alternative>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductScore {
    pub barcode: String,
    pub product: ProductSummary,
    pub report: ScoreReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativesResponse {
    pub label: String,
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

//! Error taxonomy for scoring operations

use thiserror::Error;

/// Result type for scoring operations
pub type Result<T> = std::result::Result<T, ScoreError>;

/// Errors raised by the scoring core
///
/// Missing nutrition data is not an error; it is reported as a
/// [`DataWarning`](crate::models::DataWarning) alongside the features.
#[derive(Error, Debug)]
pub enum ScoreError {
    /// The barcode has no matching product
    #[error("Product not found for barcode {barcode}")]
    LookupNotFound { barcode: String },

    /// The product database could not be reached or answered garbage
    #[error("Product lookup failed: {0}")]
    LookupTransport(String),

    /// The barcode is not a digit string
    #[error("Invalid barcode: {0:?}")]
    InvalidBarcode(String),

    /// A model artifact is missing, corrupt or incompatible with the input shape
    #[error("Failed to load {artifact} model: {reason}")]
    ModelLoad { artifact: String, reason: String },

    /// Fewer candidates than requested for a suggestion draw
    #[error("Only {available} alternatives labeled {label:?}, {requested} requested")]
    Underflow {
        label: String,
        requested: usize,
        available: usize,
    },

    /// Running a loaded model failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The alternatives dataset could not be read
    #[error("Alternatives dataset error: {0}")]
    Dataset(String),

    /// Manual input outside the accepted ranges
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ScoreError {
    /// Short machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ScoreError::LookupNotFound { .. } => "lookup_not_found",
            ScoreError::LookupTransport(_) => "lookup_transport",
            ScoreError::InvalidBarcode(_) => "invalid_barcode",
            ScoreError::ModelLoad { .. } => "model_load",
            ScoreError::Underflow { .. } => "underflow",
            ScoreError::Inference(_) => "inference",
            ScoreError::Dataset(_) => "dataset",
            ScoreError::InvalidInput(_) => "invalid_input",
        }
    }

    pub(crate) fn model_load(artifact: &str, reason: impl std::fmt::Display) -> Self {
        ScoreError::ModelLoad {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        }
    }
}

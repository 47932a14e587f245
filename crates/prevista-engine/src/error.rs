use prevista_core::{Ticker, ValidationError};
use prevista_ml::ModelError;
use prevista_warehouse::WarehouseError;
use thiserror::Error;

/// Failures surfaced by training, inference and teardown.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("insufficient data for {ticker}: {detail}")]
    InsufficientData { ticker: Ticker, detail: String },

    #[error("model for {ticker} is not available yet, try again shortly")]
    ModelNotReady { ticker: Ticker },

    #[error("model artifact {path} not found")]
    ModelArtifactMissing { path: String },

    #[error("no model registered for {ticker}")]
    ModelNotFound { ticker: Ticker },

    #[error("lag window must be between 1 and {max}, got {n_lags}")]
    InvalidLags { n_lags: usize, max: usize },

    #[error("stored model expects columns that current data lacks: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Model(ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("artifact serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("background task failed: {0}")]
    Task(String),
}

impl ForecastError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "forecast.insufficient_data",
            Self::ModelNotReady { .. } => "forecast.model_not_ready",
            Self::ModelArtifactMissing { .. } => "forecast.artifact_missing",
            Self::ModelNotFound { .. } => "forecast.model_not_found",
            Self::InvalidLags { .. } => "forecast.invalid_lags",
            Self::SchemaMismatch { .. } => "forecast.schema_mismatch",
            Self::Warehouse(_) => "forecast.warehouse",
            Self::Model(_) => "forecast.model",
            Self::Io(_) => "forecast.io",
            Self::Serialization(_) => "forecast.serialization",
            Self::Validation(_) => "forecast.validation",
            Self::Task(_) => "forecast.task",
        }
    }

    /// Model errors in the context of `ticker`: a table too small to use is
    /// insufficient data, a missing column is a schema mismatch.
    pub(crate) fn from_model(ticker: &Ticker, error: ModelError) -> Self {
        match error {
            ModelError::InsufficientRows { .. } => Self::InsufficientData {
                ticker: ticker.clone(),
                detail: error.to_string(),
            },
            ModelError::SchemaMismatch { missing } => Self::SchemaMismatch { missing },
            other => Self::Model(other),
        }
    }
}

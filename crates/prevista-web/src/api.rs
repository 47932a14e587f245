use axum::extract::{Path, Query, State};
use axum::Json;
use prevista_core::Ticker;
use prevista_engine::config::MAX_LAGS;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub ticker: String,
    pub open_price_previsto: f64,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub ticker: String,
    pub mensagem: String,
    pub logs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub ticker: String,
    pub mensagem: String,
}

/// Optional `?lags=N`; falls back to the engine default.
#[derive(Debug, Default, Deserialize)]
pub struct LagsQuery {
    pub lags: Option<usize>,
}

impl LagsQuery {
    fn resolve(&self, state: &AppState) -> Result<usize, ApiError> {
        match self.lags {
            Some(0) => Err(ApiError::BadRequest("lags must be at least 1".to_string())),
            Some(lags) if lags > MAX_LAGS => Err(ApiError::BadRequest(format!(
                "lags must be at most {MAX_LAGS}"
            ))),
            Some(lags) => Ok(lags),
            None => Ok(state.engine.config().default_lags),
        }
    }
}

/// GET /
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "prevista forecast API online",
    })
}

/// GET /prever/:ticker
#[instrument(skip(state))]
pub async fn predict_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<LagsQuery>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let ticker = Ticker::parse(&ticker)?;
    let lags = query.resolve(&state)?;

    let prediction = state.engine.predict_next_open(&ticker, lags).await?;
    info!(
        algorithm = %prediction.algorithm,
        trained_now = prediction.trained_now,
        "served prediction"
    );

    Ok(Json(PredictionResponse {
        ticker: ticker.to_string(),
        open_price_previsto: round4(prediction.open_price),
    }))
}

/// GET /treinar/:ticker
#[instrument(skip(state))]
pub async fn train_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<LagsQuery>,
) -> Result<Json<TrainResponse>, ApiError> {
    let ticker = Ticker::parse(&ticker)?;
    let lags = query.resolve(&state)?;

    let report = state.engine.train(&ticker, lags).await?;
    Ok(Json(TrainResponse {
        ticker: ticker.to_string(),
        mensagem: format!("Model trained successfully ({})", report.algorithm),
        logs: report.logs,
    }))
}

/// GET /destreinar/:ticker
#[instrument(skip(state))]
pub async fn remove_handler(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<RemoveResponse>, ApiError> {
    let ticker = Ticker::parse(&ticker)?;
    let mensagem = state.engine.remove(&ticker).await?;
    Ok(Json(RemoveResponse {
        ticker: ticker.to_string(),
        mensagem,
    }))
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

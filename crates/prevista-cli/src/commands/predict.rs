use prevista_core::Ticker;
use prevista_engine::ForecastEngine;
use serde::Serialize;

use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct PredictOutput {
    ticker: String,
    open_price_previsto: f64,
    algorithm: String,
    trained_now: bool,
    logs: Vec<String>,
}

pub async fn run(
    engine: &ForecastEngine,
    ticker: &Ticker,
    lags: usize,
    pretty: bool,
) -> Result<(), CliError> {
    let prediction = engine.predict_next_open(ticker, lags).await?;
    output::render(
        &PredictOutput {
            ticker: prediction.ticker.to_string(),
            open_price_previsto: (prediction.open_price * 10_000.0).round() / 10_000.0,
            algorithm: prediction.algorithm.to_string(),
            trained_now: prediction.trained_now,
            logs: prediction.logs,
        },
        pretty,
    )
}

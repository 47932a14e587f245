use prevista_core::Ticker;
use prevista_engine::ForecastEngine;
use serde_json::json;

use crate::error::CliError;
use crate::output;

pub async fn run(engine: &ForecastEngine, ticker: &Ticker, pretty: bool) -> Result<(), CliError> {
    let mensagem = engine.remove(ticker).await?;
    output::render(&json!({ "ticker": ticker.as_str(), "mensagem": mensagem }), pretty)
}

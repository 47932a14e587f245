use prevista_core::Ticker;
use prevista_engine::ForecastEngine;

use crate::error::CliError;
use crate::output;

pub async fn run(
    engine: &ForecastEngine,
    ticker: &Ticker,
    lags: usize,
    pretty: bool,
) -> Result<(), CliError> {
    let report = engine.train(ticker, lags).await?;
    output::render(&report, pretty)
}

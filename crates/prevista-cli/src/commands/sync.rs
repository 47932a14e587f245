use prevista_core::Ticker;
use prevista_engine::ForecastEngine;

use crate::error::CliError;
use crate::output;

pub async fn run(engine: &ForecastEngine, ticker: &Ticker, pretty: bool) -> Result<(), CliError> {
    let report = engine.sync(ticker).await;
    output::render(&report, pretty)?;

    if report.is_failure() {
        return Err(CliError::SyncFailed {
            ticker: ticker.to_string(),
        });
    }
    Ok(())
}

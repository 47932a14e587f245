mod predict;
mod remove;
mod serve;
mod sync;
mod train;

use std::sync::Arc;

use prevista_core::{Ticker, YahooAdapter};
use prevista_engine::ForecastEngine;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let engine = open_engine(cli)?;
    let lags = engine.config().default_lags;

    match &cli.command {
        Command::Sync(args) => sync::run(&engine, &parse(&args.ticker)?, cli.pretty).await,
        Command::Train(args) => train::run(&engine, &parse(&args.ticker)?, lags, cli.pretty).await,
        Command::Predict(args) => {
            predict::run(&engine, &parse(&args.ticker)?, lags, cli.pretty).await
        }
        Command::Remove(args) => remove::run(&engine, &parse(&args.ticker)?, cli.pretty).await,
        Command::Serve(args) => serve::run(engine, args.addr()).await,
    }
}

fn open_engine(cli: &Cli) -> Result<ForecastEngine, CliError> {
    let source = YahooAdapter::default().with_timeout_ms(cli.timeout_ms);
    Ok(ForecastEngine::open(cli.engine_config(), Arc::new(source))?)
}

fn parse(raw: &str) -> Result<Ticker, CliError> {
    Ok(Ticker::parse(raw)?)
}

//! CLI argument definitions for prevista.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sync` | Pull missing daily bars for a ticker into the warehouse |
//! | `train` | Fit every candidate model and keep the best one |
//! | `predict` | Forecast the next session's open, training on first use |
//! | `remove` | Delete a ticker's model and stored history |
//! | `serve` | Run the HTTP API |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--home` | `$PREVISTA_HOME` or `~/.prevista` | Root for data and models |
//! | `--database` | `<home>/data/prevista.duckdb` | DuckDB file |
//! | `--artifact-dir` | `<home>/models` | Model artifact directory |
//! | `--suffix` | `.SA` | Exchange suffix appended for the provider |
//! | `--lags` | `3` | Lag window for train/predict |
//! | `--timeout-ms` | `10000` | Provider request timeout |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! prevista predict PETR4 --pretty
//! prevista train VALE3 --lags 5
//! prevista serve --port 8000
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use prevista_engine::config::{DEFAULT_MARKET_SUFFIX, MAX_LAGS};
use prevista_engine::EngineConfig;

/// Next-session open price forecasts for exchange-listed stocks.
#[derive(Debug, Parser)]
#[command(name = "prevista", author, version, about)]
pub struct Cli {
    /// Root directory for the database and model artifacts.
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// DuckDB database file (overrides `<home>/data/prevista.duckdb`).
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Directory holding one model artifact per ticker.
    #[arg(long, global = true)]
    pub artifact_dir: Option<PathBuf>,

    /// Exchange suffix appended to tickers when querying the provider.
    #[arg(long, global = true, default_value = DEFAULT_MARKET_SUFFIX)]
    pub suffix: String,

    /// Number of lagged sessions used as features.
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..=MAX_LAGS as i64))]
    pub lags: Option<u16>,

    /// Provider request timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Engine configuration after applying command-line overrides.
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = match &self.home {
            Some(home) => EngineConfig::under(home),
            None => EngineConfig::default(),
        };
        if let Some(database) = &self.database {
            config.warehouse.db_path = database.clone();
        }
        if let Some(artifact_dir) = &self.artifact_dir {
            config.artifact_dir = artifact_dir.clone();
        }
        if let Some(lags) = self.lags {
            config.default_lags = usize::from(lags);
        }
        config.market_suffix = self.suffix.clone();
        config
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pull missing daily bars for a ticker.
    ///
    ///   prevista sync PETR4
    Sync(TickerArgs),

    /// Train and persist the best model for a ticker.
    ///
    ///   prevista train PETR4 --lags 5
    Train(TickerArgs),

    /// Forecast the next session's opening price.
    ///
    /// Trains a model first when the ticker has none.
    ///
    ///   prevista predict PETR4
    Predict(TickerArgs),

    /// Delete a ticker's model artifact, model pointer and price history.
    ///
    ///   prevista remove PETR4
    Remove(TickerArgs),

    /// Serve the HTTP API.
    ///
    ///   prevista serve --host 0.0.0.0 --port 8000
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct TickerArgs {
    /// Exchange ticker without suffix (e.g. PETR4).
    pub ticker: String,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    #[arg(long, default_value_t = 8000)]
    pub port: u16,
}

impl ServeArgs {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

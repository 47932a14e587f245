//! # Prevista Warehouse
//!
//! Embedded DuckDB storage for daily price history and model pointers.
//!
//! ## Overview
//!
//! - **Parameterized SQL**: ticker symbols and dates are always bound, never interpolated
//! - **Versioned migrations** tracked in `schema_migrations`
//! - **Connection pooling** over a single database instance
//! - **Transactional writes**: batch inserts and ticker teardown commit or roll back as a unit
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prevista_core::Ticker;
//! use prevista_warehouse::{Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!     let ticker = Ticker::parse("PETR4")?;
//!     println!("latest stored day: {:?}", warehouse.latest_date(&ticker)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `historico_acoes` | Daily OHLCV bars, keyed by (Ticker, InfoDate) |
//! | `ticker_model` | Current model artifact per ticker |
//! | `schema_migrations` | Applied migration versions |

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use prevista_core::domain::calendar::{format_iso_date, parse_iso_date};
use prevista_core::{HistoricalBar, ProviderBar, Ticker};
use serde::Serialize;
use thiserror::Error;
use time::Date;
use tracing::debug;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A stored value could not be interpreted.
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for prevista data.
    pub prevista_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::under(resolve_prevista_home())
    }
}

impl WarehouseConfig {
    /// Configuration rooted at `prevista_home`, with the database at
    /// `<home>/data/prevista.duckdb`.
    pub fn under(prevista_home: impl Into<PathBuf>) -> Self {
        let prevista_home = prevista_home.into();
        let db_path = prevista_home.join("data").join("prevista.duckdb");
        Self {
            prevista_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// The persisted ticker → artifact mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelPointer {
    pub ticker: Ticker,
    pub model_path: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub updated_at: String,
}

/// Rows removed by [`Warehouse::remove_ticker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub pointer_rows: usize,
    pub bar_rows: usize,
}

/// The main storage interface.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open the database described by `config`, creating parent directories
    /// and applying migrations.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Most recent stored trading day for `ticker`, if any.
    pub fn latest_date(&self, ticker: &Ticker) -> Result<Option<Date>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 1] = [&ticker.as_str()];
        let latest: Option<String> = connection.query_row(
            "SELECT CAST(MAX(InfoDate) AS VARCHAR) FROM historico_acoes WHERE Ticker = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;
        latest.as_deref().map(parse_stored_date).transpose()
    }

    /// Append provider rows for `ticker` in one transaction.
    ///
    /// Rows whose date is already stored are ignored. Returns the number of
    /// rows actually inserted.
    pub fn append_bars(&self, ticker: &Ticker, bars: &[ProviderBar]) -> Result<usize, WarehouseError> {
        if bars.is_empty() {
            return Ok(0);
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut inserted = 0;
            for bar in bars {
                let date = format_iso_date(bar.date);
                let params: [&dyn ToSql; 7] = [
                    &date,
                    &ticker.as_str(),
                    &bar.open,
                    &bar.close,
                    &bar.high,
                    &bar.low,
                    &bar.volume,
                ];
                inserted += connection.execute(
                    "INSERT OR IGNORE INTO historico_acoes \
                     (InfoDate, Ticker, OpenPrice, ClosePrice, HighPrice, LowPrice, Volume) \
                     VALUES (CAST(? AS DATE), ?, ?, ?, ?, ?, ?)",
                    params.as_slice(),
                )?;
            }
            Ok(inserted)
        })();

        let inserted = finalize_transaction(&connection, result)?;
        debug!(ticker = %ticker, offered = bars.len(), inserted, "appended bars");
        Ok(inserted)
    }

    /// Full history for `ticker`, ascending by date.
    pub fn load_bars(&self, ticker: &Ticker) -> Result<Vec<HistoricalBar>, WarehouseError> {
        let connection = self.manager.acquire()?;
        query_bars(
            &connection,
            ticker,
            "SELECT CAST(InfoDate AS VARCHAR), OpenPrice, ClosePrice, HighPrice, LowPrice, Volume \
             FROM historico_acoes WHERE Ticker = ? ORDER BY InfoDate ASC",
            None,
        )
    }

    /// The `limit` most recent bars for `ticker`, re-sorted ascending.
    pub fn recent_bars(&self, ticker: &Ticker, limit: usize) -> Result<Vec<HistoricalBar>, WarehouseError> {
        let limit = i64::try_from(limit)
            .map_err(|_| WarehouseError::InvalidData(format!("row limit {limit} is too large")))?;
        let connection = self.manager.acquire()?;
        let mut bars = query_bars(
            &connection,
            ticker,
            "SELECT CAST(InfoDate AS VARCHAR), OpenPrice, ClosePrice, HighPrice, LowPrice, Volume \
             FROM historico_acoes WHERE Ticker = ? ORDER BY InfoDate DESC LIMIT ?",
            Some(limit),
        )?;
        bars.reverse();
        Ok(bars)
    }

    pub fn count_bars(&self, ticker: &Ticker) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 1] = [&ticker.as_str()];
        let count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM historico_acoes WHERE Ticker = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|_| WarehouseError::InvalidData(format!("bad row count {count}")))
    }

    pub fn model_pointer(&self, ticker: &Ticker) -> Result<Option<ModelPointer>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 1] = [&ticker.as_str()];
        let mut statement = connection.prepare(
            "SELECT model_path, CAST(updated_at AS VARCHAR) FROM ticker_model WHERE ticker = ?",
        )?;
        let mut rows = statement.query(params.as_slice())?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        Ok(Some(ModelPointer {
            ticker: ticker.clone(),
            model_path: row.get(0)?,
            updated_at: row.get(1)?,
        }))
    }

    /// Insert or replace the pointer row for `ticker`.
    pub fn upsert_model_pointer(
        &self,
        ticker: &Ticker,
        model_path: &str,
        updated_at: &str,
    ) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 3] = [&ticker.as_str(), &model_path, &updated_at];
        connection.execute(
            "INSERT OR REPLACE INTO ticker_model (ticker, model_path, updated_at) \
             VALUES (?, ?, CAST(? AS TIMESTAMP))",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Delete the pointer row and every stored bar for `ticker` in one transaction.
    pub fn remove_ticker(&self, ticker: &Ticker) -> Result<TeardownReport, WarehouseError> {
        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<TeardownReport, WarehouseError> {
            let params: [&dyn ToSql; 1] = [&ticker.as_str()];
            let pointer_rows =
                connection.execute("DELETE FROM ticker_model WHERE ticker = ?", params.as_slice())?;
            let bar_rows =
                connection.execute("DELETE FROM historico_acoes WHERE Ticker = ?", params.as_slice())?;
            Ok(TeardownReport {
                pointer_rows,
                bar_rows,
            })
        })();

        finalize_transaction(&connection, result)
    }
}

/// Commit on success, roll back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

type RawBar = (String, Option<f64>, Option<f64>, Option<f64>, Option<f64>, Option<f64>);

fn query_bars(
    connection: &Connection,
    ticker: &Ticker,
    sql: &str,
    limit: Option<i64>,
) -> Result<Vec<HistoricalBar>, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let symbol = ticker.as_str();
    let map_row = |row: &::duckdb::Row<'_>| -> Result<RawBar, ::duckdb::Error> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    };

    let raw: Vec<RawBar> = match limit {
        Some(limit) => {
            let params: [&dyn ToSql; 2] = [&symbol, &limit];
            statement
                .query_map(params.as_slice(), map_row)?
                .collect::<Result<_, _>>()?
        }
        None => {
            let params: [&dyn ToSql; 1] = [&symbol];
            statement
                .query_map(params.as_slice(), map_row)?
                .collect::<Result<_, _>>()?
        }
    };

    raw.into_iter()
        .map(|(date, open, close, high, low, volume)| {
            Ok(HistoricalBar {
                date: parse_stored_date(&date)?,
                ticker: ticker.clone(),
                open,
                close,
                high,
                low,
                volume,
            })
        })
        .collect()
}

fn parse_stored_date(value: &str) -> Result<Date, WarehouseError> {
    parse_iso_date(value).map_err(|e| WarehouseError::InvalidData(e.to_string()))
}

/// Resolve the prevista home directory from environment or default.
fn resolve_prevista_home() -> PathBuf {
    if let Some(path) = env::var_os("PREVISTA_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".prevista");
    }

    PathBuf::from(".prevista")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use time::macros::date;

    fn open_warehouse(root: &Path) -> Warehouse {
        Warehouse::open(WarehouseConfig {
            prevista_home: root.to_path_buf(),
            db_path: root.join("data").join("prevista.duckdb"),
            max_pool_size: 2,
        })
        .expect("warehouse open")
    }

    fn bar(date: Date, open: f64) -> ProviderBar {
        ProviderBar::new(
            date,
            Some(open),
            Some(open + 1.0),
            Some(open - 1.0),
            Some(open + 0.5),
            Some(1_000.0),
        )
    }

    fn ticker(symbol: &str) -> Ticker {
        Ticker::parse(symbol).expect("valid ticker")
    }

    #[test]
    fn initializes_tables() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(temp.path());
        let connection = warehouse.manager.acquire().expect("connection");

        let tables: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_name IN ('historico_acoes', 'ticker_model')",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(tables, 2);
    }

    #[test]
    fn append_ignores_dates_already_stored() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(temp.path());
        let petr = ticker("PETR4");

        let first = [bar(date!(2024 - 03 - 04), 10.0), bar(date!(2024 - 03 - 05), 11.0)];
        assert_eq!(warehouse.append_bars(&petr, &first).expect("append"), 2);

        let overlapping = [bar(date!(2024 - 03 - 05), 99.0), bar(date!(2024 - 03 - 06), 12.0)];
        warehouse.append_bars(&petr, &overlapping).expect("append overlap");

        let bars = warehouse.load_bars(&petr).expect("load");
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[1].open, Some(11.0));
        assert_eq!(warehouse.latest_date(&petr).expect("latest"), Some(date!(2024 - 03 - 06)));
    }

    #[test]
    fn missing_values_round_trip_as_null() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(temp.path());
        let vale = ticker("VALE3");

        let sparse = ProviderBar::new(date!(2024 - 01 - 02), None, Some(70.0), None, Some(69.5), None);
        warehouse.append_bars(&vale, &[sparse]).expect("append");

        let stored = warehouse.load_bars(&vale).expect("load");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].open, None);
        assert_eq!(stored[0].close, Some(69.5));
        assert_eq!(stored[0].high, Some(70.0));
        assert_eq!(stored[0].volume, None);
    }

    #[test]
    fn recent_bars_are_the_latest_window_ascending() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(temp.path());
        let itub = ticker("ITUB4");
        let rows: Vec<_> = (1..=9)
            .map(|day| bar(Date::from_calendar_date(2024, time::Month::May, day).expect("date"), f64::from(day)))
            .collect();
        warehouse.append_bars(&itub, &rows).expect("append");

        let recent = warehouse.recent_bars(&itub, 4).expect("recent");
        let days: Vec<u8> = recent.iter().map(|b| b.date.day()).collect();
        assert_eq!(days, vec![6, 7, 8, 9]);
    }

    #[test]
    fn tickers_are_isolated_and_bound_as_parameters() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(temp.path());
        let a = ticker("BBAS3");
        let b = ticker("BBDC4");
        warehouse.append_bars(&a, &[bar(date!(2024 - 02 - 01), 50.0)]).expect("append a");

        assert_eq!(warehouse.count_bars(&a).expect("count a"), 1);
        assert_eq!(warehouse.count_bars(&b).expect("count b"), 0);
        assert_eq!(warehouse.latest_date(&b).expect("latest b"), None);
    }

    #[test]
    fn model_pointer_upsert_replaces_existing_row() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(temp.path());
        let wege = ticker("WEGE3");
        assert!(warehouse.model_pointer(&wege).expect("lookup").is_none());

        warehouse
            .upsert_model_pointer(&wege, "/models/WEGE3_model.json", "2024-05-01 10:00:00")
            .expect("insert");
        warehouse
            .upsert_model_pointer(&wege, "/models/WEGE3_model.json", "2024-05-02 11:30:00")
            .expect("replace");

        let pointer = warehouse.model_pointer(&wege).expect("lookup").expect("present");
        assert_eq!(pointer.model_path, "/models/WEGE3_model.json");
        assert_eq!(pointer.updated_at, "2024-05-02 11:30:00");
    }

    #[test]
    fn remove_ticker_deletes_pointer_and_bars_together() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_warehouse(temp.path());
        let abev = ticker("ABEV3");
        let keep = ticker("MGLU3");
        warehouse
            .append_bars(&abev, &[bar(date!(2024 - 02 - 01), 14.0), bar(date!(2024 - 02 - 02), 14.2)])
            .expect("append");
        warehouse.append_bars(&keep, &[bar(date!(2024 - 02 - 01), 2.0)]).expect("append keep");
        warehouse
            .upsert_model_pointer(&abev, "/models/ABEV3_model.json", "2024-02-03 09:00:00")
            .expect("pointer");

        let report = warehouse.remove_ticker(&abev).expect("remove");
        assert_eq!(report, TeardownReport { pointer_rows: 1, bar_rows: 2 });
        assert_eq!(warehouse.count_bars(&abev).expect("count"), 0);
        assert!(warehouse.model_pointer(&abev).expect("lookup").is_none());
        assert_eq!(warehouse.count_bars(&keep).expect("count keep"), 1);
    }

    #[test]
    fn default_config_lives_under_data_dir() {
        let config = WarehouseConfig::under("/tmp/prevista-home");
        assert_eq!(
            config.db_path,
            PathBuf::from("/tmp/prevista-home/data/prevista.duckdb")
        );
    }
}

//! Watermark-based history sync.
//!
//! Each run fetches the days after the latest stored bar (or the configured
//! history window for a new ticker) and appends them. Failures never escape:
//! they end up in the report's status and log lines, and callers carry on with
//! whatever history is already stored.

use std::sync::Arc;

use prevista_core::domain::calendar::today_utc;
use prevista_core::{DailyBarsRequest, MarketDataSource, Ticker};
use prevista_warehouse::Warehouse;
use serde::Serialize;
use time::{Date, Duration};
use tracing::{info, instrument, warn};

/// Outcome of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "rows", rename_all = "snake_case")]
pub enum SyncStatus {
    /// New bars were stored.
    Inserted(usize),
    /// The watermark is already at today.
    UpToDate,
    /// The provider had nothing for the window.
    NoProviderData,
    /// Provider or storage error; details are in the log.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    pub logs: Vec<String>,
}

impl SyncReport {
    pub fn is_failure(&self) -> bool {
        self.status == SyncStatus::Failed
    }
}

/// Pulls missing daily bars from a provider into the warehouse.
#[derive(Clone)]
pub struct Synchronizer {
    warehouse: Warehouse,
    source: Arc<dyn MarketDataSource>,
    market_suffix: String,
    history_days: i64,
}

impl Synchronizer {
    pub fn new(
        warehouse: Warehouse,
        source: Arc<dyn MarketDataSource>,
        market_suffix: impl Into<String>,
        history_days: i64,
    ) -> Self {
        Self {
            warehouse,
            source,
            market_suffix: market_suffix.into(),
            history_days,
        }
    }

    pub async fn sync(&self, ticker: &Ticker) -> SyncReport {
        self.sync_as_of(ticker, today_utc()).await
    }

    /// Sync with an explicit notion of "today".
    #[instrument(skip(self, ticker), fields(ticker = %ticker, source = self.source.id()))]
    pub async fn sync_as_of(&self, ticker: &Ticker, today: Date) -> SyncReport {
        let mut logs = Vec::new();
        let status = match self.run(ticker, today, &mut logs).await {
            Ok(status) => status,
            Err(message) => {
                warn!(%message, "sync failed");
                logs.push(format!("{ticker}: sync failed: {message}"));
                SyncStatus::Failed
            }
        };
        SyncReport { status, logs }
    }

    async fn run(
        &self,
        ticker: &Ticker,
        today: Date,
        logs: &mut Vec<String>,
    ) -> Result<SyncStatus, String> {
        let watermark = self
            .warehouse
            .latest_date(ticker)
            .map_err(|e| format!("could not read latest stored date: {e}"))?;

        let start = match watermark {
            Some(latest) => latest + Duration::days(1),
            None => today - Duration::days(self.history_days),
        };
        // The window is [start, today): nothing to ask for once yesterday is stored.
        if start >= today {
            note(logs, format!("{ticker}: already up to date"));
            return Ok(SyncStatus::UpToDate);
        }

        let symbol = ticker.with_suffix(&self.market_suffix);
        note(logs, format!("{ticker}: fetching {symbol} from {start} to {today}"));
        // Provider windows are end-exclusive, so today's unfinished session is never stored.
        let request = DailyBarsRequest::new(symbol, start, today).map_err(|e| e.to_string())?;
        let bars = self
            .source
            .daily_bars(request)
            .await
            .map_err(|e| format!("provider {} failed: {e}", self.source.id()))?;

        if bars.is_empty() {
            note(logs, format!("{ticker}: no new data from provider"));
            return Ok(SyncStatus::NoProviderData);
        }

        let inserted = self
            .warehouse
            .append_bars(ticker, &bars)
            .map_err(|e| format!("could not store bars: {e}"))?;
        note(logs, format!("{ticker}: inserted {inserted} new rows"));
        Ok(SyncStatus::Inserted(inserted))
    }
}

fn note(logs: &mut Vec<String>, message: String) {
    info!("{message}");
    logs.push(message);
}

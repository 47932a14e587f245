//! Shared fixtures for the behavior tests.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use prevista_core::domain::calendar::today_utc;
use prevista_core::{
    DailyBarsRequest, HistoricalBar, MarketDataSource, ProviderBar, SourceError, Ticker,
};
use prevista_engine::{EngineConfig, ForecastEngine};
use time::{Date, Duration};

/// In-memory provider serving a fixed history and counting calls.
pub struct StaticSource {
    bars: Vec<ProviderBar>,
    calls: AtomicUsize,
    latency: Option<StdDuration>,
}

impl StaticSource {
    pub fn new(bars: Vec<ProviderBar>) -> Self {
        Self {
            bars,
            calls: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// `days` daily bars ending yesterday.
    pub fn recent(days: usize) -> Self {
        Self::new(synthetic_bars(today_utc() - Duration::days(days as i64), days))
    }

    pub fn with_latency(mut self, latency: StdDuration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bars(&self) -> &[ProviderBar] {
        &self.bars
    }
}

impl MarketDataSource for StaticSource {
    fn id(&self) -> &'static str {
        "static"
    }

    fn daily_bars<'a>(
        &'a self,
        req: DailyBarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ProviderBar>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            Ok(self
                .bars
                .iter()
                .filter(|bar| req.contains(bar.date))
                .cloned()
                .collect())
        })
    }
}

/// `count` consecutive daily bars from `first`, smooth but not collinear.
pub fn synthetic_bars(first: Date, count: usize) -> Vec<ProviderBar> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let open = 42.0 + (t / 7.0).sin() * 3.0 + t * 0.04;
            ProviderBar::new(
                first + Duration::days(i as i64),
                Some(open),
                Some(open + 0.9 + (t / 3.0).cos().abs() * 0.3),
                Some(open - 0.8 - (t / 5.0).sin().abs() * 0.3),
                Some(open + (t / 2.0).sin() * 0.5),
                Some(3.0e5 + (t * 0.8).cos() * 6.0e4),
            )
        })
        .collect()
}

/// The same series as stored bars for `ticker`.
pub fn historical_bars(ticker: &str, first: Date, count: usize) -> Vec<HistoricalBar> {
    let ticker = ticker_of(ticker);
    synthetic_bars(first, count)
        .iter()
        .map(|bar| HistoricalBar::from_provider(ticker.clone(), bar))
        .collect()
}

pub fn ticker_of(symbol: &str) -> Ticker {
    Ticker::parse(symbol).expect("valid ticker")
}

/// Engine rooted at `home` and backed by `source`.
pub fn engine_with(home: &Path, source: Arc<StaticSource>) -> ForecastEngine {
    ForecastEngine::open(EngineConfig::under(home), source).expect("engine opens")
}

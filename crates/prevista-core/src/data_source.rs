//! Market-data provider contract.
//!
//! This module defines the adapter contract (`MarketDataSource`) that every
//! historical-price provider implements, together with its request type and
//! structured error.
//!
//! # Example
//!
//! ```rust,ignore
//! use prevista_core::{DailyBarsRequest, MarketDataSource, YahooAdapter};
//! use time::macros::date;
//!
//! async fn fetch(adapter: &YahooAdapter) -> Result<(), prevista_core::SourceError> {
//!     let request = DailyBarsRequest::new("PETR4.SA", date!(2024 - 01 - 02), date!(2024 - 02 - 01))?;
//!     for bar in adapter.daily_bars(request).await? {
//!         println!("{} open={:?}", bar.date, bar.open);
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use time::Date;

use crate::ProviderBar;

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Internal,
}

/// Structured provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for daily bar downloads.
///
/// The window is half-open: providers return trading days with
/// `start <= date < end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBarsRequest {
    pub symbol: String,
    pub start: Date,
    pub end: Date,
}

impl DailyBarsRequest {
    pub fn new(symbol: impl Into<String>, start: Date, end: Date) -> Result<Self, SourceError> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(SourceError::invalid_request(
                "daily bars request requires a symbol",
            ));
        }
        if start > end {
            return Err(SourceError::invalid_request(format!(
                "daily bars window start {start} is after end {end}"
            )));
        }
        Ok(Self { symbol, start, end })
    }

    pub fn contains(&self, date: Date) -> bool {
        date >= self.start && date < self.end
    }
}

/// Historical market-data provider contract.
///
/// Implementations must be `Send + Sync`; the engine shares one instance
/// across concurrent requests.
pub trait MarketDataSource: Send + Sync {
    /// Short provider identifier used in logs.
    fn id(&self) -> &'static str;

    /// Fetches daily OHLCV rows for the request window.
    ///
    /// An empty vector means the provider had nothing for the window; it is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the provider is unreachable, rate limited,
    /// or returns a payload that cannot be interpreted.
    fn daily_bars<'a>(
        &'a self,
        req: DailyBarsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ProviderBar>, SourceError>> + Send + 'a>>;
}

//! # Prevista Core
//!
//! Domain types and provider contracts shared by the prevista crates.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo) |
//! | [`data_source`] | Provider trait, request and error types |
//! | [`domain`] | Tickers, daily bars and calendar helpers |
//! | [`error`] | Validation errors |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`retry`] | Retry and backoff policy for provider calls |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use prevista_core::{DailyBarsRequest, MarketDataSource, Ticker, YahooAdapter};
//! use time::macros::date;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ticker = Ticker::parse("PETR4")?;
//!     let adapter = YahooAdapter::default();
//!     let request = DailyBarsRequest::new(
//!         ticker.with_suffix(".SA"),
//!         date!(2024 - 01 - 02),
//!         date!(2024 - 02 - 01),
//!     )?;
//!     let bars = adapter.daily_bars(request).await?;
//!     println!("{} bars", bars.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use prevista_core::{SourceError, SourceErrorKind};
//!
//! fn handle_error(error: SourceError) {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited | SourceErrorKind::Unavailable => {
//!             // Try again on the next sync
//!         }
//!         SourceErrorKind::InvalidRequest => {
//!             // Report to user
//!         }
//!         SourceErrorKind::Internal => {}
//!     }
//! }
//! ```

pub mod adapters;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod retry;

pub use adapters::{YahooAdapter, YahooSession};

pub use data_source::{DailyBarsRequest, MarketDataSource, SourceError, SourceErrorKind};

pub use domain::{HistoricalBar, ProviderBar, Ticker};

pub use error::ValidationError;

pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

pub use retry::{Backoff, RetryConfig};

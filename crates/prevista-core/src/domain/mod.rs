//! # Domain Models
//!
//! Canonical domain types for prevista market data.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated exchange ticker |
//! | [`HistoricalBar`] | Stored daily OHLCV row for one ticker |
//! | [`ProviderBar`] | Normalized daily row returned by a provider |
//!
//! Calendar helpers in [`calendar`] convert between `time::Date`, ISO strings
//! and the unix timestamps providers speak.

pub mod calendar;
mod bar;
mod ticker;

pub use bar::{HistoricalBar, ProviderBar};
pub use ticker::Ticker;

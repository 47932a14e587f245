//! Provider adapters implementing [`crate::MarketDataSource`].

mod yahoo;

pub use yahoo::{YahooAdapter, YahooSession};

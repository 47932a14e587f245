//! # Prevista Engine
//!
//! The model lifecycle for next-day open forecasts:
//!
//! ```text
//! provider ──sync──▶ historico_acoes ──features──▶ select_best ──▶ artifact + ticker_model
//!                                        ▲                                   │
//!                                        └──────── predict_next_open ◀───────┘
//! ```
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`sync`] | Watermark sync from a [`prevista_core::MarketDataSource`] |
//! | [`engine`] | Training, inference and teardown ([`ForecastEngine`]) |
//! | [`artifact`] | JSON model files, written atomically |
//! | [`locks`] | Per-ticker single-flight locks |
//! | [`config`] | [`EngineConfig`] |
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prevista_core::{Ticker, YahooAdapter};
//! use prevista_engine::{EngineConfig, ForecastEngine};
//!
//! let engine = ForecastEngine::open(EngineConfig::default(), Arc::new(YahooAdapter::default()))?;
//! let forecast = engine.predict_next_open(&Ticker::parse("PETR4")?, 3).await?;
//! println!("{:.4}", forecast.open_price);
//! ```

pub mod artifact;
pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod sync;

pub use artifact::{ArtifactStore, StoredModel};
pub use config::EngineConfig;
pub use engine::{ForecastEngine, Prediction, TrainReport};
pub use error::ForecastError;
pub use locks::TickerLocks;
pub use sync::{SyncReport, SyncStatus, Synchronizer};

//! # Prevista ML
//!
//! Turns daily bars into a supervised table and picks the best of four
//! regressor families for next-open forecasting.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`features`] | Lag features and the next-open target |
//! | [`split`] | Chronological train/test split |
//! | [`scaler`] | Standardisation |
//! | [`linear`], [`tree`], [`forest`], [`boosting`] | Regressors |
//! | [`metrics`] | MSE and R² |
//! | [`pipeline`] | Serialisable scaler + regressor bound to feature names |
//! | [`selection`] | Lowest hold-out MSE wins |
//!
//! ```rust,ignore
//! use prevista_ml::{build_features, select_best};
//!
//! let table = build_features(&bars, 3)?;
//! let selection = select_best(&table, 3, 42)?;
//! println!("{} won with MSE {:.4}", selection.best.algorithm, selection.best_metrics.mse);
//! ```

pub mod boosting;
pub mod error;
pub mod features;
pub mod forest;
pub mod linear;
pub mod metrics;
pub mod pipeline;
pub mod scaler;
pub mod selection;
pub mod split;
pub mod tree;

pub use error::ModelError;
pub use features::{
    build_features, build_inference_features, feature_names, FeatureTable, BASE_FIELDS,
    TARGET_COLUMN,
};
pub use metrics::Metrics;
pub use pipeline::{Algorithm, ForecastPipeline, Regressor};
pub use selection::{select_best, CandidateOutcome, CandidateScore, Selection};
pub use split::{chronological_split, SplitIndex};

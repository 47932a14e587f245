//! Lag features over daily bars.
//!
//! Column layout is fixed: the five base fields of the current bar, then for
//! each base field (same order) its lags `1..=n_lags`. Training tables carry
//! `OpenPriceTarget`, the next bar's open.

use std::ops::Range;

use ndarray::{Array1, Array2};
use prevista_core::HistoricalBar;
use time::Date;

use crate::ModelError;

pub const BASE_FIELDS: [&str; 5] = ["OpenPrice", "ClosePrice", "HighPrice", "LowPrice", "Volume"];
pub const TARGET_COLUMN: &str = "OpenPriceTarget";

/// Feature column names for a lag window, in table order.
pub fn feature_names(n_lags: usize) -> Vec<String> {
    let mut names: Vec<String> = BASE_FIELDS.iter().map(|f| (*f).to_string()).collect();
    for field in BASE_FIELDS {
        for lag in 1..=n_lags {
            names.push(format!("{field}_lag_{lag}"));
        }
    }
    names
}

/// A dense feature matrix with named columns, one row per surviving bar.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub dates: Vec<Date>,
    pub features: Array2<f64>,
    pub target: Option<Array1<f64>>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.column_index(name)?;
        Some(self.features.column(index).to_vec())
    }

    /// Copy of `rows` as a new table.
    pub fn slice_rows(&self, rows: Range<usize>) -> FeatureTable {
        FeatureTable {
            columns: self.columns.clone(),
            dates: self.dates[rows.clone()].to_vec(),
            features: self.features.slice(ndarray::s![rows.clone(), ..]).to_owned(),
            target: self
                .target
                .as_ref()
                .map(|t| t.slice(ndarray::s![rows]).to_owned()),
        }
    }

    /// Matrix holding `names` in the given order; any absent name is a
    /// schema mismatch. Extra table columns are ignored.
    pub fn select(&self, names: &[String]) -> Result<Array2<f64>, ModelError> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name) {
                Some(index) => indices.push(index),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(ModelError::SchemaMismatch { missing });
        }
        Ok(self.features.select(ndarray::Axis(1), &indices))
    }

    /// Target column, for tables built for training.
    pub fn target(&self) -> Result<&Array1<f64>, ModelError> {
        self.target.as_ref().ok_or_else(|| ModelError::SchemaMismatch {
            missing: vec![TARGET_COLUMN.to_string()],
        })
    }
}

/// Training table: lag features plus next-open target.
///
/// Bars are sorted by date first. Rows lacking a full lag history, the last
/// row (no target) and any row with a missing value are dropped.
pub fn build_features(bars: &[HistoricalBar], n_lags: usize) -> Result<FeatureTable, ModelError> {
    build(bars, n_lags, true)
}

/// Inference table: same columns as training, no target, so the most recent
/// bar survives.
pub fn build_inference_features(
    bars: &[HistoricalBar],
    n_lags: usize,
) -> Result<FeatureTable, ModelError> {
    build(bars, n_lags, false)
}

fn build(
    bars: &[HistoricalBar],
    n_lags: usize,
    with_target: bool,
) -> Result<FeatureTable, ModelError> {
    let mut sorted: Vec<&HistoricalBar> = bars.iter().collect();
    sorted.sort_by_key(|bar| bar.date);

    let columns = feature_names(n_lags);
    let width = columns.len();
    let mut values = Vec::new();
    let mut dates = Vec::new();
    let mut targets = Vec::new();

    for i in n_lags..sorted.len() {
        let target = if with_target {
            match sorted.get(i + 1).and_then(|next| next.open) {
                Some(open) => Some(open),
                None => continue,
            }
        } else {
            None
        };

        let mut row = Vec::with_capacity(width);
        row.extend(base_values(sorted[i]));
        for field in 0..BASE_FIELDS.len() {
            for lag in 1..=n_lags {
                row.push(base_values(sorted[i - lag])[field]);
            }
        }

        let Some(row) = row.into_iter().collect::<Option<Vec<f64>>>() else {
            continue;
        };
        values.extend(row);
        dates.push(sorted[i].date);
        if let Some(target) = target {
            targets.push(target);
        }
    }

    let features = into_matrix(dates.len(), width, values)?;

    Ok(FeatureTable {
        columns,
        dates,
        features,
        target: with_target.then(|| Array1::from(targets)),
    })
}

/// Row-major `values` as a `rows x width` matrix.
fn into_matrix(rows: usize, width: usize, values: Vec<f64>) -> Result<Array2<f64>, ModelError> {
    let found = values.len();
    Array2::from_shape_vec((rows, width), values).map_err(|_| ModelError::ShapeMismatch {
        expected: rows * width,
        found,
    })
}

fn base_values(bar: &HistoricalBar) -> [Option<f64>; 5] {
    [bar.open, bar.close, bar.high, bar.low, bar.volume]
}

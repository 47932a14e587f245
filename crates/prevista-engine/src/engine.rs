use std::path::PathBuf;
use std::sync::Arc;

use prevista_core::domain::calendar::now_sql_timestamp;
use prevista_core::{MarketDataSource, Ticker};
use prevista_ml::{build_features, build_inference_features, select_best, Algorithm, CandidateScore};
use prevista_warehouse::{ModelPointer, Warehouse};
use serde::Serialize;
use tracing::{info, instrument};

use crate::artifact::ArtifactStore;
use crate::locks::TickerLocks;
use crate::sync::{SyncReport, Synchronizer};
use crate::config::MAX_LAGS;
use crate::{EngineConfig, ForecastError};

/// Result of a training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub ticker: Ticker,
    pub algorithm: Algorithm,
    pub model_path: PathBuf,
    pub mse: f64,
    pub r2: f64,
    pub candidates: Vec<CandidateScore>,
    pub trained_at: String,
    pub logs: Vec<String>,
}

/// A next-open forecast.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub ticker: Ticker,
    pub open_price: f64,
    pub algorithm: Algorithm,
    /// True when no model existed and one was trained for this request.
    pub trained_now: bool,
    pub logs: Vec<String>,
}

/// Orchestrates sync, training, inference and teardown per ticker.
#[derive(Clone)]
pub struct ForecastEngine {
    config: EngineConfig,
    warehouse: Warehouse,
    synchronizer: Synchronizer,
    artifacts: ArtifactStore,
    locks: TickerLocks,
}

impl ForecastEngine {
    /// Open the warehouse described by `config` and wire the engine to `source`.
    pub fn open(config: EngineConfig, source: Arc<dyn MarketDataSource>) -> Result<Self, ForecastError> {
        let warehouse = Warehouse::open(config.warehouse.clone())?;
        Ok(Self::with_warehouse(config, warehouse, source))
    }

    pub fn with_warehouse(
        config: EngineConfig,
        warehouse: Warehouse,
        source: Arc<dyn MarketDataSource>,
    ) -> Self {
        let synchronizer = Synchronizer::new(
            warehouse.clone(),
            source,
            config.market_suffix.clone(),
            config.history_days,
        );
        let artifacts = ArtifactStore::new(config.artifact_dir.clone());
        Self {
            config,
            warehouse,
            synchronizer,
            artifacts,
            locks: TickerLocks::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    pub async fn sync(&self, ticker: &Ticker) -> SyncReport {
        self.synchronizer.sync(ticker).await
    }

    /// Sync, fit every candidate and persist the winner for `ticker`.
    #[instrument(skip(self, ticker), fields(ticker = %ticker))]
    pub async fn train(&self, ticker: &Ticker, n_lags: usize) -> Result<TrainReport, ForecastError> {
        check_lags(n_lags)?;
        let _guard = self.locks.lock(ticker).await;
        self.train_locked(ticker, n_lags, Vec::new()).await
    }

    /// Caller holds the ticker lock.
    async fn train_locked(
        &self,
        ticker: &Ticker,
        n_lags: usize,
        mut logs: Vec<String>,
    ) -> Result<TrainReport, ForecastError> {
        logs.extend(self.synchronizer.sync(ticker).await.logs);

        let bars = self.warehouse.load_bars(ticker)?;
        if bars.is_empty() {
            return Err(ForecastError::InsufficientData {
                ticker: ticker.clone(),
                detail: "no stored history".to_string(),
            });
        }

        let table =
            build_features(&bars, n_lags).map_err(|e| ForecastError::from_model(ticker, e))?;
        if table.is_empty() {
            return Err(ForecastError::InsufficientData {
                ticker: ticker.clone(),
                detail: format!(
                    "{} bars leave no complete rows with {n_lags} lags",
                    bars.len()
                ),
            });
        }

        let seed = self.config.seed;
        let selection = tokio::task::spawn_blocking(move || select_best(&table, n_lags, seed))
            .await
            .map_err(|e| ForecastError::Task(e.to_string()))?
            .map_err(|e| ForecastError::from_model(ticker, e))?;

        for candidate in &selection.candidates {
            note(&mut logs, candidate.summary());
        }

        let trained_at = now_sql_timestamp();
        let model_path = self.artifacts.save(ticker, &selection.best, &trained_at)?;
        let model_path_str = model_path.display().to_string();
        self.warehouse
            .upsert_model_pointer(ticker, &model_path_str, &trained_at)?;

        let algorithm = selection.best.algorithm;
        note(
            &mut logs,
            format!("{ticker}: best model {algorithm}, saved to {model_path_str}"),
        );

        Ok(TrainReport {
            ticker: ticker.clone(),
            algorithm,
            model_path,
            mse: selection.best_metrics.mse,
            r2: selection.best_metrics.r2,
            candidates: selection.candidates,
            trained_at,
            logs,
        })
    }

    /// Forecast the next session's open, training a model first if the
    /// ticker has none.
    #[instrument(skip(self, ticker), fields(ticker = %ticker))]
    pub async fn predict_next_open(
        &self,
        ticker: &Ticker,
        n_lags: usize,
    ) -> Result<Prediction, ForecastError> {
        let needed = check_lags(n_lags)?;
        let mut logs = self.synchronizer.sync(ticker).await.logs;
        let (pointer, trained_now) = self.pointer_or_train(ticker, n_lags, &mut logs).await?;

        let stored = self.artifacts.load(PathBuf::from(&pointer.model_path).as_path())?;

        let bars = self.warehouse.recent_bars(ticker, needed)?;
        if bars.len() < needed {
            return Err(ForecastError::InsufficientData {
                ticker: ticker.clone(),
                detail: format!("need {needed} bars for {n_lags} lags, found {}", bars.len()),
            });
        }

        let table = build_inference_features(&bars, n_lags)
            .map_err(|e| ForecastError::from_model(ticker, e))?;
        if table.is_empty() {
            return Err(ForecastError::InsufficientData {
                ticker: ticker.clone(),
                detail: "latest bars have missing values".to_string(),
            });
        }

        let open_price = stored
            .pipeline
            .predict_latest(&table)
            .map_err(|e| ForecastError::from_model(ticker, e))?;
        note(
            &mut logs,
            format!("{ticker}: next open forecast {open_price:.4} ({})", stored.pipeline.algorithm),
        );

        Ok(Prediction {
            ticker: ticker.clone(),
            open_price,
            algorithm: stored.pipeline.algorithm,
            trained_now,
            logs,
        })
    }

    /// Current pointer, training under the ticker lock when absent. Callers
    /// racing on a new ticker wait for the first one's training and reuse it.
    async fn pointer_or_train(
        &self,
        ticker: &Ticker,
        n_lags: usize,
        logs: &mut Vec<String>,
    ) -> Result<(ModelPointer, bool), ForecastError> {
        if let Some(pointer) = self.warehouse.model_pointer(ticker)? {
            return Ok((pointer, false));
        }

        let _guard = self.locks.lock(ticker).await;
        if let Some(pointer) = self.warehouse.model_pointer(ticker)? {
            return Ok((pointer, false));
        }

        note(logs, format!("{ticker}: no model found, training one"));
        let report = self.train_locked(ticker, n_lags, Vec::new()).await?;
        logs.extend(report.logs);

        let pointer = self
            .warehouse
            .model_pointer(ticker)?
            .ok_or_else(|| ForecastError::ModelNotReady {
                ticker: ticker.clone(),
            })?;
        Ok((pointer, true))
    }

    /// Delete the model artifact, its pointer and the ticker's stored history.
    #[instrument(skip(self, ticker), fields(ticker = %ticker))]
    pub async fn remove(&self, ticker: &Ticker) -> Result<String, ForecastError> {
        let _guard = self.locks.lock(ticker).await;

        let pointer = self
            .warehouse
            .model_pointer(ticker)?
            .ok_or_else(|| ForecastError::ModelNotFound {
                ticker: ticker.clone(),
            })?;
        let path = PathBuf::from(&pointer.model_path);
        if !path.is_file() {
            return Err(ForecastError::ModelArtifactMissing {
                path: pointer.model_path,
            });
        }

        let removed = self.warehouse.remove_ticker(ticker)?;
        self.artifacts.delete(&path)?;
        info!(
            bars = removed.bar_rows,
            path = %path.display(),
            "ticker removed"
        );

        Ok(format!("Model and price history for {ticker} removed."))
    }
}

/// Bars needed to build one inference row for `n_lags`.
fn check_lags(n_lags: usize) -> Result<usize, ForecastError> {
    match n_lags.checked_add(1) {
        Some(needed) if (1..=MAX_LAGS).contains(&n_lags) => Ok(needed),
        _ => Err(ForecastError::InvalidLags {
            n_lags,
            max: MAX_LAGS,
        }),
    }
}

fn note(logs: &mut Vec<String>, message: String) {
    info!("{message}");
    logs.push(message);
}

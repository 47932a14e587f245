//! On-disk model artifacts, one JSON file per ticker.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use prevista_core::Ticker;
use prevista_ml::ForecastPipeline;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ForecastError;

const FORMAT_VERSION: u32 = 1;

/// Serialized form of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredModel {
    pub format_version: u32,
    pub ticker: Ticker,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub trained_at: String,
    pub pipeline: ForecastPipeline,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<TICKER>_model.json`.
    pub fn path_for(&self, ticker: &Ticker) -> PathBuf {
        self.dir.join(format!("{}_model.json", ticker.as_str()))
    }

    /// Write the model next to its final path and rename it into place, so a
    /// reader never sees a half-written file.
    pub fn save(
        &self,
        ticker: &Ticker,
        pipeline: &ForecastPipeline,
        trained_at: &str,
    ) -> Result<PathBuf, ForecastError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(ticker);
        let tmp = self.dir.join(format!(".{}_model.json.tmp", ticker.as_str()));

        let stored = StoredModel {
            format_version: FORMAT_VERSION,
            ticker: ticker.clone(),
            trained_at: trained_at.to_string(),
            pipeline: pipeline.clone(),
        };
        fs::write(&tmp, serde_json::to_vec(&stored)?)?;
        fs::rename(&tmp, &path)?;
        debug!(ticker = %ticker, path = %path.display(), "model artifact written");
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<StoredModel, ForecastError> {
        let bytes = fs::read(path).map_err(|e| missing_or_io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn delete(&self, path: &Path) -> Result<(), ForecastError> {
        fs::remove_file(path).map_err(|e| missing_or_io(path, e))
    }
}

fn missing_or_io(path: &Path, error: std::io::Error) -> ForecastError {
    if error.kind() == ErrorKind::NotFound {
        ForecastError::ModelArtifactMissing {
            path: path.display().to_string(),
        }
    } else {
        ForecastError::Io(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prevista_core::HistoricalBar;
    use prevista_ml::{build_features, Algorithm};
    use tempfile::tempdir;
    use time::macros::date;
    use time::Duration;

    fn pipeline(ticker: &Ticker) -> ForecastPipeline {
        let bars: Vec<HistoricalBar> = (0..30)
            .map(|i| {
                let t = f64::from(i);
                HistoricalBar {
                    date: date!(2024 - 01 - 01) + Duration::days(i64::from(i)),
                    ticker: ticker.clone(),
                    open: Some(20.0 + (t / 3.0).sin()),
                    close: Some(20.5 + (t / 4.0).cos()),
                    high: Some(21.0 + t * 0.01),
                    low: Some(19.0 - t * 0.01),
                    volume: Some(1000.0 + t),
                }
            })
            .collect();
        let table = build_features(&bars, 2).expect("features");
        ForecastPipeline::fit(Algorithm::DecisionTree, &table, 2, 42).expect("fit")
    }

    #[test]
    fn save_then_load_preserves_the_pipeline() {
        let temp = tempdir().expect("tempdir");
        let store = ArtifactStore::new(temp.path().join("models"));
        let ticker = Ticker::parse("BBAS3").expect("ticker");
        let fitted = pipeline(&ticker);

        let path = store.save(&ticker, &fitted, "2024-02-01 18:00:00").expect("save");
        assert_eq!(path, temp.path().join("models").join("BBAS3_model.json"));

        let stored = store.load(&path).expect("load");
        assert_eq!(stored.ticker, ticker);
        assert_eq!(stored.pipeline, fitted);
        assert_eq!(stored.trained_at, "2024-02-01 18:00:00");
        assert!(!temp.path().join("models").join(".BBAS3_model.json.tmp").exists());
    }

    #[test]
    fn missing_file_is_a_desync_error() {
        let temp = tempdir().expect("tempdir");
        let store = ArtifactStore::new(temp.path());
        let path = temp.path().join("GONE3_model.json");

        assert!(matches!(
            store.load(&path),
            Err(ForecastError::ModelArtifactMissing { .. })
        ));
        assert!(matches!(
            store.delete(&path),
            Err(ForecastError::ModelArtifactMissing { .. })
        ));
    }
}

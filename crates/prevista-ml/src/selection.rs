use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::features::FeatureTable;
use crate::metrics::Metrics;
use crate::pipeline::{Algorithm, ForecastPipeline};
use crate::split::chronological_split;
use crate::ModelError;

/// How one candidate fared on the hold-out rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Scored { mse: f64, r2: f64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub algorithm: Algorithm,
    pub outcome: CandidateOutcome,
}

impl CandidateScore {
    /// Human-readable line for training logs.
    pub fn summary(&self) -> String {
        match &self.outcome {
            CandidateOutcome::Scored { mse, r2 } => {
                format!("{}: MSE={mse:.4}, R²={r2:.4}", self.algorithm)
            }
            CandidateOutcome::Failed { reason } => format!("{}: skipped ({reason})", self.algorithm),
        }
    }
}

/// Winner of a selection round plus the scores of every candidate.
#[derive(Debug, Clone)]
pub struct Selection {
    pub best: ForecastPipeline,
    pub best_metrics: Metrics,
    pub candidates: Vec<CandidateScore>,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Fit every [`Algorithm`] on the chronological training split and keep the
/// one with the lowest hold-out MSE.
///
/// Candidates are tried in [`Algorithm::ALL`] order and compared with a
/// strict `<`, so on equal MSE the earlier algorithm wins. A candidate that
/// fails to fit or scores a non-finite MSE is recorded and skipped.
pub fn select_best(table: &FeatureTable, n_lags: usize, seed: u64) -> Result<Selection, ModelError> {
    let split = chronological_split(table.len())?;
    let train = table.slice_rows(split.train.clone());
    let test = table.slice_rows(split.test.clone());
    let test_target = test.target()?;

    let mut candidates = Vec::with_capacity(Algorithm::ALL.len());
    let mut best: Option<(ForecastPipeline, Metrics)> = None;

    for algorithm in Algorithm::ALL {
        let scored = ForecastPipeline::fit(algorithm, &train, n_lags, seed).and_then(|pipeline| {
            let predictions = pipeline.predict(&test)?;
            Ok((pipeline, Metrics::evaluate(test_target.view(), predictions.view())))
        });

        match scored {
            Ok((pipeline, metrics)) if metrics.mse.is_finite() => {
                debug!(%algorithm, mse = metrics.mse, r2 = metrics.r2, "scored candidate");
                candidates.push(CandidateScore {
                    algorithm,
                    outcome: CandidateOutcome::Scored {
                        mse: metrics.mse,
                        r2: metrics.r2,
                    },
                });
                let improves = best
                    .as_ref()
                    .map_or(true, |(_, current)| metrics.mse < current.mse);
                if improves {
                    best = Some((pipeline, metrics));
                }
            }
            Ok((_, metrics)) => {
                warn!(%algorithm, mse = metrics.mse, "candidate produced a non-finite error");
                candidates.push(CandidateScore {
                    algorithm,
                    outcome: CandidateOutcome::Failed {
                        reason: format!("non-finite MSE {}", metrics.mse),
                    },
                });
            }
            Err(error) => {
                warn!(%algorithm, %error, "candidate failed to fit");
                candidates.push(CandidateScore {
                    algorithm,
                    outcome: CandidateOutcome::Failed {
                        reason: error.to_string(),
                    },
                });
            }
        }
    }

    let (best, best_metrics) = best.ok_or(ModelError::NoViableCandidate)?;
    Ok(Selection {
        best,
        best_metrics,
        candidates,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
    })
}

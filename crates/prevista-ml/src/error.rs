use thiserror::Error;

/// Errors raised while building features, fitting or applying models.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("need at least {needed} rows, found {available}")]
    InsufficientRows { needed: usize, available: usize },

    #[error("feature columns missing at inference: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("{algorithm} failed to fit: {message}")]
    Fit {
        algorithm: &'static str,
        message: String,
    },

    #[error("no candidate model produced a finite test error")]
    NoViableCandidate,

    #[error("expected {expected} values, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

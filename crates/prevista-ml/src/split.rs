use std::ops::Range;

use crate::ModelError;

/// Held-out share is `1 / TEST_DIVISOR` of the rows, rounded up.
pub const TEST_DIVISOR: usize = 5;

/// Row ranges of a chronological train/test split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndex {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

/// Hold out the last `ceil(0.2 * n_rows)` rows, in order.
pub fn chronological_split(n_rows: usize) -> Result<SplitIndex, ModelError> {
    let test_len = n_rows.div_ceil(TEST_DIVISOR);
    let train_len = n_rows.saturating_sub(test_len);
    if train_len == 0 || test_len == 0 {
        return Err(ModelError::InsufficientRows {
            needed: 2,
            available: n_rows,
        });
    }

    Ok(SplitIndex {
        train: 0..train_len,
        test: train_len..n_rows,
    })
}

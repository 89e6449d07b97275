//! Error taxonomy for the risk-scoring core.

use thiserror::Error;

/// Preconditions the pipeline refuses to run without.
///
/// A collision without a station in range is not represented here: that is
/// the `None` outcome of a nearest-station query and is tallied in
/// [`crate::risk::AssignmentReport`].
#[derive(Debug, Error)]
pub enum RiskError {
    /// A tunable is outside its admissible range.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A station, trip or collision row failed validation.
    #[error("invalid {table} row {row}: {reason}")]
    InvalidInputRow {
        table: &'static str,
        row: usize,
        reason: String,
    },

    /// One of the input tables has no rows.
    #[error("empty dataset: no {0} supplied")]
    EmptyDataset(&'static str),

    /// Pooled exposure is zero so the global mean cannot be formed.
    #[error("global mean undefined: total exposure across {cells} cells is zero")]
    UndefinedGlobalMean { cells: usize },
}

impl RiskError {
    pub fn invalid_row(table: &'static str, row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidInputRow {
            table,
            row,
            reason: reason.into(),
        }
    }
}

pub type RiskResult<T> = Result<T, RiskError>;

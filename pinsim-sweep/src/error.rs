use std::path::PathBuf;

use thiserror::Error;

/// Errors that may occur when loading or querying a recorded sweep.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The dataset location does not exist.
    #[error("sweep store not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The store exists, but holds no run with this experiment name and run id.
    #[error("no run {run_id} recorded for experiment `{experiment}`")]
    RunNotFound { experiment: String, run_id: i64 },

    /// The requested output parameter was not recorded in the run.
    #[error("output parameter `{name}` not found, available: {available:?}")]
    UnknownOutput {
        name: String,
        available: Vec<String>,
    },

    /// The coordinate matrix does not have one column per axis.
    #[error("coordinates have {actual} columns, expected one per axis ({expected})")]
    AxisCount { expected: usize, actual: usize },

    /// The run has no usable samples or no output columns.
    #[error("sweep `{name}` is empty: {reason}")]
    Empty { name: String, reason: &'static str },

    /// An output column does not have one value per sample.
    #[error("output `{output}` has {actual} values, expected {expected}")]
    Shape {
        output: String,
        expected: usize,
        actual: usize,
    },

    /// A recorded coordinate is NaN and cannot be ordered on its axis.
    #[error("axis `{axis}` holds a NaN coordinate at sample {sample}")]
    NanCoordinate { axis: String, sample: usize },

    /// Any other failure reported by the underlying SQLite store.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

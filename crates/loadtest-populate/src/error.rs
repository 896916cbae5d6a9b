//! Error types for the insert workload.

use thiserror::Error;

/// Errors that can occur while running the insert workload.
///
/// Only `Config` is fatal to the whole process. Provisioning and execution
/// errors end the affected task and are reported by it; the remaining tasks
/// keep running.
#[derive(Error, Debug)]
pub enum PopulateError {
    /// Invalid process parameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Checking or creating the task's table failed.
    #[error("Task [{task:02}]: failed to provision table '{table}': {cause:#}")]
    Provisioning {
        task: u32,
        table: String,
        cause: anyhow::Error,
    },

    /// A sub-batch failed during a tick.
    #[error("Task [{task:02}]: batch insert failed after {inserted} rows: {cause:#}")]
    StorageExecution {
        task: u32,
        inserted: u64,
        cause: anyhow::Error,
    },

    /// Operator typed something the control plane does not understand.
    #[error("Unknown command '{0}', expected one of [start, stop]")]
    UnrecognizedCommand(String),
}

//! Error types for CLI operations.

use dispatcher::DispatchError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// A worker stopped on a dispatch core error
    #[error("Worker {worker} failed: {source}")]
    Worker {
        worker: String,
        #[source]
        source: DispatchError,
    },

    /// A worker task panicked or was cancelled
    #[error("Worker {worker} did not finish: {message}")]
    WorkerAborted { worker: String, message: String },

    /// Graceful shutdown error
    #[error("Error during shutdown: {message}")]
    Shutdown { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn worker(worker: impl Into<String>, source: DispatchError) -> Self {
        Self::Worker {
            worker: worker.into(),
            source,
        }
    }

    pub fn worker_aborted(worker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WorkerAborted {
            worker: worker.into(),
            message: message.into(),
        }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }
}

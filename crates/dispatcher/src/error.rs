//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Configuration error: name has no module table entry
    #[error("configuration error: logger '{logger}' names unknown module '{module}'")]
    Resolution { logger: String, module: String },

    /// Module table already holds a module of that name
    #[error("module '{name}' is already in the module table")]
    DuplicateModule { name: String },

    /// A module's thread-init failed; the worker must not start
    #[error("thread init failed for logger '{logger}' (#{index}) on worker '{worker}': {source}")]
    ThreadInit {
        worker: String,
        logger: String,
        index: usize,
        #[source]
        source: ContractError,
    },

    /// Registry/store pairing violated
    #[error("dispatch invariant violated in {operation}: {message}")]
    Invariant {
        operation: &'static str,
        message: String,
    },

    /// Shutdown attempted while workers still hold the registry
    #[error("registry still in use by {holders} other handle(s)")]
    RegistryInUse { holders: usize },

    /// Backend could not build its shared context
    #[error("failed to create output '{output}': {source}")]
    Backend {
        output: String,
        #[source]
        source: ContractError,
    },

    /// Contract error
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
}

impl DispatchError {
    pub fn resolution(logger: impl Into<String>, module: impl Into<String>) -> Self {
        Self::Resolution {
            logger: logger.into(),
            module: module.into(),
        }
    }

    pub fn invariant(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Invariant {
            operation,
            message: message.into(),
        }
    }

    pub fn backend(output: impl Into<String>, source: ContractError) -> Self {
        Self::Backend {
            output: output.into(),
            source,
        }
    }

    /// Whether the enclosing worker or process must stop
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RegistryInUse { .. })
    }
}

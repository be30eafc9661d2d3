//! Layered error definitions
//!
//! Categorized by source: config / module / backend

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Module Errors =====
    /// Name has no entry in the module table
    #[error("no module named '{name}' in the module table")]
    UnknownModule { name: String },

    /// Module thread-init callable failed
    #[error("thread init of module '{module}' failed: {message}")]
    ThreadInit { module: String, message: String },

    // ===== Backend Errors =====
    /// Backend could not build its shared output context
    #[error("output '{output}' init error: {message}")]
    BackendInit { output: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create thread init error
    pub fn thread_init(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ThreadInit {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Create backend init error
    pub fn backend_init(output: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendInit {
            output: output.into(),
            message: message.into(),
        }
    }
}

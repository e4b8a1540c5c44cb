//! Error types for causegraph
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

/// Main error type for causegraph operations
#[derive(Debug, Error)]
pub enum CausalityError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (double activation, use before activation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Export error (oversized universe, unwritable stream)
    #[error("Export error: {0}")]
    Export(String),
}

impl From<serde_json::Error> for CausalityError {
    fn from(err: serde_json::Error) -> Self {
        CausalityError::Export(err.to_string())
    }
}

impl CausalityError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        CausalityError::Config(msg.into())
    }

    /// Create an export error
    pub fn export(msg: impl Into<String>) -> Self {
        CausalityError::Export(msg.into())
    }
}

/// Result type alias for causegraph operations
pub type Result<T> = std::result::Result<T, CausalityError>;

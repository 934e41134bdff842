//! # Error Module
//!
//! Typed errors for the tuning pipeline. Only structural misuse is an error
//! here: silence, an empty search band or an unmatched target are ordinary
//! results and never surface as `TunerError`.

use thiserror::Error;

/// Errors raised by the core library.
#[derive(Debug, Error)]
pub enum TunerError {
    /// Buffers or blocks with a shape the pipeline cannot process.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value that breaks one of the config invariants.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("configuration file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TunerError>;

//! Error types for narr-sync
//!
//! The engine's event handlers never fail; these errors only come from
//! loading configuration, payloads, and replay traces.

use thiserror::Error;

/// Main error type for narr-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from shared ingestion code
    #[error(transparent)]
    Common(#[from] narr_common::Error),

    /// JSON decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed replay trace
    #[error("Trace error: {0}")]
    Trace(String),
}

/// Convenience Result type using narr-sync Error
pub type Result<T> = std::result::Result<T, Error>;

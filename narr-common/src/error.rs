//! Common error types for narr crates

use thiserror::Error;

/// Common result type for narr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across narr crates
///
/// Only ingestion boundaries (payload JSON, config files) produce these.
/// The playback engine itself degrades to safe defaults instead of failing.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON payload (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML document (wraps toml::de::Error)
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input that cannot be coerced to a safe default
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

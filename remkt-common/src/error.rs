//! Common error types for remkt

use thiserror::Error;

/// Common result type for remkt operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across remkt crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error (wraps toml::de::Error)
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

//! Error types shared by every ctxmem crate.

use thiserror::Error;

/// Memory engine error types
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid conversation item: {0}")]
    InvalidItem(String),

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for memory operations
pub type Result<T> = std::result::Result<T, MemoryError>;

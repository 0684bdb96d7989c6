//! Error types for the LungScan service.

use thiserror::Error;

/// Main error type for LungScan operations.
#[derive(Error, Debug)]
pub enum LungscanError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream inference service errors
    #[error("Inference service error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// History storage errors
    #[error("History store error: {0}")]
    History(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for LungScan operations.
pub type Result<T> = std::result::Result<T, LungscanError>;

//! Error types for quizbeacon-core

use thiserror::Error;

/// Main error type for the quizbeacon-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Event delivery error
    #[error("delivery error: {0}")]
    Delivery(String),
}

/// Result type alias for quizbeacon-core
pub type Result<T> = std::result::Result<T, Error>;

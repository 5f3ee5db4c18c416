//! Error types for Camix.

use thiserror::Error;

/// Common error type for Camix.
#[derive(Error, Debug)]
pub enum CamixError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    ///
    /// Also raised when the registry cannot create its default channel.
    #[error("configuration error: {0}")]
    Config(String),

    /// A channel name was looked up but is not registered.
    #[error("channel '{0}' not found")]
    UnknownChannel(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),
}

impl From<toml::de::Error> for CamixError {
    fn from(e: toml::de::Error) -> Self {
        CamixError::Config(e.to_string())
    }
}

/// Result type alias for Camix operations.
pub type Result<T> = std::result::Result<T, CamixError>;

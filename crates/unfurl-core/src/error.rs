//! Error types for unfurl.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Input errors
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // Upstream errors
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Response exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by an
    /// upstream or by this service.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::InvalidUrl(_) | Error::InvalidKey(_))
    }
}

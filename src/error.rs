//! Error types for the coincount library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for coincount operations
pub type Result<T> = std::result::Result<T, CoinError>;

#[derive(Error, Debug)]
pub enum CoinError {
    /// A configuration value is unusable for classification
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// Image file could not be opened or decoded
    #[error("Failed to load image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Configuration file could not be read or parsed
    #[error("Failed to load config {}: {message}", path.display())]
    ConfigLoad { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl CoinError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// True for errors the operator can fix by entering another value
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, CoinError::InvalidConfiguration { .. })
    }
}

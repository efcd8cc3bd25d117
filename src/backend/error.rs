//! Error types for annotation backend operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or saving annotations.
#[derive(Error, Debug)]
pub enum BackendError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored annotation content could not be parsed
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// The dataset does not exist
    #[error("Dataset not found: {path:?}")]
    DatasetNotFound {
        /// Where the dataset was expected
        path: PathBuf,
    },

    /// The backend refused the request
    #[error("Request rejected: {message}")]
    Rejected {
        /// Reason given by the backend
        message: String,
    },

    /// The I/O worker is gone
    #[error("Backend worker disconnected")]
    Disconnected,
}

impl BackendError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Create a rejection error with a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

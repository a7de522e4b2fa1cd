//! Client-side error type

use warden_shamir::ShamirError;

/// Failures of client-side recovery steps
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Encryption toward a recipient failed
    #[error("sealing failed: {message}")]
    Sealing {
        /// Failure detail
        message: String,
    },

    /// A sealed shard could not be authenticated or decrypted
    #[error("opening failed: {message}")]
    Opening {
        /// Failure detail
        message: String,
    },

    /// Caller-supplied input is unusable
    #[error("invalid input: {message}")]
    Validation {
        /// Failure detail
        message: String,
    },

    /// Splitting or reconstruction failed
    #[error(transparent)]
    Shamir(#[from] ShamirError),
}

impl ClientError {
    /// Create a sealing error
    pub fn sealing(message: impl Into<String>) -> Self {
        Self::Sealing {
            message: message.into(),
        }
    }

    /// Create an opening error
    pub fn opening(message: impl Into<String>) -> Self {
        Self::Opening {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Result alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

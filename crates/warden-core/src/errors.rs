//! Unified error type for warden operations
//!
//! Business rejections, authentication failures and infrastructure failures
//! are distinct variants so callers (and the HTTP layer) never confuse
//! "not enough shares yet" with "invalid signature" or "storage is down".

use serde::{Deserialize, Serialize};

/// Unified error type for all warden operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum WardenError {
    /// Missing or malformed input, or a threshold out of range
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// Signature material (signature, timestamp or signer) is missing
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Which piece of authentication was missing
        message: String,
    },

    /// Signature present but invalid, stale, or for another action
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Why the signature was refused
        message: String,
    },

    /// The owner has no live recovery configuration
    #[error("Recovery not configured: {message}")]
    NotConfigured {
        /// Owner reference that was looked up
        message: String,
    },

    /// The session is absent or has expired
    #[error("Recovery session not found: {recovery_id}")]
    SessionNotFound {
        /// Session identifier that was looked up
        recovery_id: String,
    },

    /// The signer is valid but not a member of the session's guardian set
    #[error("Not a guardian for this recovery: {guardian}")]
    NotAGuardian {
        /// Guardian public key that was refused
        guardian: String,
    },

    /// Shards were requested before the threshold was reached
    #[error("Recovery not ready: {submitted} of {threshold} shards submitted")]
    NotReady {
        /// Shards submitted so far
        submitted: usize,
        /// Shards required
        threshold: usize,
    },

    /// The session no longer accepts this operation
    #[error("Recovery session closed: {message}")]
    SessionClosed {
        /// Current state of the session
        message: String,
    },

    /// The handle is registered to another identity
    #[error("Handle already taken: {handle}")]
    HandleTaken {
        /// Requested handle
        handle: String,
    },

    /// Storage failed; the request is rejected rather than partially applied
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        /// Underlying storage failure
        message: String,
    },

    /// A record or payload could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl WardenError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a not configured error
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured {
            message: message.into(),
        }
    }

    /// Create a session not found error
    pub fn session_not_found(recovery_id: impl ToString) -> Self {
        Self::SessionNotFound {
            recovery_id: recovery_id.to_string(),
        }
    }

    /// Create a not-a-guardian error
    pub fn not_a_guardian(guardian: impl ToString) -> Self {
        Self::NotAGuardian {
            guardian: guardian.to_string(),
        }
    }

    /// Create a not ready error carrying current progress
    pub fn not_ready(submitted: usize, threshold: usize) -> Self {
        Self::NotReady {
            submitted,
            threshold,
        }
    }

    /// Create a session closed error
    pub fn session_closed(message: impl Into<String>) -> Self {
        Self::SessionClosed {
            message: message.into(),
        }
    }

    /// Create a handle taken error
    pub fn handle_taken(handle: impl ToString) -> Self {
        Self::HandleTaken {
            handle: handle.to_string(),
        }
    }

    /// Create a storage unavailable error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::NotConfigured { .. } => "not_configured",
            Self::SessionNotFound { .. } => "session_not_found",
            Self::NotAGuardian { .. } => "not_a_guardian",
            Self::NotReady { .. } => "not_ready",
            Self::SessionClosed { .. } => "session_closed",
            Self::HandleTaken { .. } => "handle_taken",
            Self::StorageUnavailable { .. } => "storage_unavailable",
            Self::Serialization { .. } => "serialization_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Whether this is an authentication failure (missing or bad signature)
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Forbidden { .. })
    }
}

/// Standard Result type for warden operations
pub type Result<T> = std::result::Result<T, WardenError>;

impl From<serde_json::Error> for WardenError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<crate::effects::StorageError> for WardenError {
    fn from(err: crate::effects::StorageError) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<crate::effects::TimeError> for WardenError {
    fn from(err: crate::effects::TimeError) -> Self {
        Self::internal(err.to_string())
    }
}

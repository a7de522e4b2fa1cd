//! Key-value storage effect interface
//!
//! The recovery service treats storage as an external collaborator: a
//! durable key-value store with per-key expiry, single-key compare-and-swap
//! and an all-or-nothing batch write guarded by value checks. Expired
//! records must be invisible to every operation.

use async_trait::async_trait;
use std::time::Duration;

/// Error type for storage operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be reached or refused the operation
    #[error("storage backend unavailable: {message}")]
    Unavailable {
        /// Backend failure description
        message: String,
    },

    /// A batch was rejected as a whole; nothing was written
    #[error("batch rejected: {message}")]
    BatchRejected {
        /// Why the batch was refused
        message: String,
    },
}

impl StorageError {
    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a batch rejected error
    pub fn batch_rejected(message: impl Into<String>) -> Self {
        Self::BatchRejected {
            message: message.into(),
        }
    }
}

/// Expiry applied by a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The record never expires
    Never,
    /// The record expires this long after the write
    After(Duration),
    /// Keep the current deadline of the record being replaced
    Keep,
}

/// One step of an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Precondition: the live value of `key` must equal `expected`
    ///
    /// `expected = None` requires the key to be absent or expired. Checks
    /// are evaluated before any write; one failing check aborts the batch.
    Check {
        /// Key to compare
        key: String,
        /// Required current value
        expected: Option<Vec<u8>>,
    },
    /// Insert or overwrite a key
    Put {
        /// Key to write
        key: String,
        /// New value
        value: Vec<u8>,
        /// Expiry of the written record
        expiry: Expiry,
    },
    /// Delete a key; deleting a missing key is not an error
    Delete {
        /// Key to delete
        key: String,
    },
}

impl BatchOp {
    /// Key touched by this operation
    pub fn key(&self) -> &str {
        match self {
            Self::Check { key, .. } | Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }

    /// Whether this step writes
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Check { .. })
    }
}

/// Storage effects used by the recovery service
#[async_trait]
pub trait StorageEffects: Send + Sync {
    /// Read a live record
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert or overwrite a record
    async fn store(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<(), StorageError>;

    /// Delete a record, returning whether a live record existed
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// Atomically replace `key` if its live value equals `expected`
    ///
    /// `expected = None` means "only if absent or expired". Returns `false`
    /// without writing when the current value differs.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Vec<u8>,
        expiry: Expiry,
    ) -> Result<bool, StorageError>;

    /// Apply every operation or none of them
    ///
    /// Returns `false` without writing when a [`BatchOp::Check`] does not
    /// hold. A key may be written at most once per batch.
    async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<bool, StorageError>;

    /// List live keys starting with `prefix`
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

#[async_trait]
impl<T: StorageEffects + ?Sized> StorageEffects for std::sync::Arc<T> {
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).retrieve(key).await
    }

    async fn store(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<(), StorageError> {
        (**self).store(key, value, expiry).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Vec<u8>,
        expiry: Expiry,
    ) -> Result<bool, StorageError> {
        (**self).compare_and_swap(key, expected, new, expiry).await
    }

    async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<bool, StorageError> {
        (**self).apply_batch(ops).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        (**self).list_keys(prefix).await
    }
}

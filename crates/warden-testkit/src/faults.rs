//! Fault-injecting storage wrapper
//!
//! Wraps any storage handler and fails selected operations with
//! `StorageError::Unavailable`, or makes conditional writes report conflicts,
//! so tests can exercise fail-closed and retry paths.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use warden_core::effects::{BatchOp, Expiry, StorageEffects, StorageError};

/// A storage operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    /// `retrieve`
    Retrieve,
    /// `store`
    Store,
    /// `remove`
    Remove,
    /// `compare_and_swap`
    CompareAndSwap,
    /// `apply_batch`
    ApplyBatch,
    /// `list_keys`
    ListKeys,
}

#[derive(Debug, Default)]
struct Faults {
    failing: HashSet<StorageOp>,
    forced_conflicts: u32,
}

/// Storage that fails on demand
pub struct FaultyStorage<S> {
    inner: Arc<S>,
    faults: Arc<Mutex<Faults>>,
}

impl<S> Clone for FaultyStorage<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            faults: Arc::clone(&self.faults),
        }
    }
}

impl<S: StorageEffects> FaultyStorage<S> {
    /// Wrap `inner` with no faults enabled
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            faults: Arc::new(Mutex::new(Faults::default())),
        }
    }

    /// The wrapped handler
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Make `op` fail until healed
    pub fn fail(&self, op: StorageOp) {
        self.faults.lock().failing.insert(op);
    }

    /// Make every operation fail until healed
    pub fn fail_all(&self) {
        let mut faults = self.faults.lock();
        for op in [
            StorageOp::Retrieve,
            StorageOp::Store,
            StorageOp::Remove,
            StorageOp::CompareAndSwap,
            StorageOp::ApplyBatch,
            StorageOp::ListKeys,
        ] {
            faults.failing.insert(op);
        }
    }

    /// Make the next `n` compare-and-swap calls or guarded batches report a
    /// conflict
    pub fn force_conflicts(&self, n: u32) {
        self.faults.lock().forced_conflicts = n;
    }

    /// Clear all faults
    pub fn heal(&self) {
        *self.faults.lock() = Faults::default();
    }

    fn check(&self, op: StorageOp) -> Result<(), StorageError> {
        if self.faults.lock().failing.contains(&op) {
            return Err(StorageError::unavailable(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    fn take_conflict(&self) -> bool {
        let mut faults = self.faults.lock();
        if faults.forced_conflicts > 0 {
            faults.forced_conflicts -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl<S: StorageEffects> StorageEffects for FaultyStorage<S> {
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.check(StorageOp::Retrieve)?;
        self.inner.retrieve(key).await
    }

    async fn store(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<(), StorageError> {
        self.check(StorageOp::Store)?;
        self.inner.store(key, value, expiry).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.check(StorageOp::Remove)?;
        self.inner.remove(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Vec<u8>,
        expiry: Expiry,
    ) -> Result<bool, StorageError> {
        self.check(StorageOp::CompareAndSwap)?;
        if self.take_conflict() {
            return Ok(false);
        }
        self.inner.compare_and_swap(key, expected, new, expiry).await
    }

    async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<bool, StorageError> {
        self.check(StorageOp::ApplyBatch)?;
        let guarded = ops.iter().any(|op| !op.is_write());
        if guarded && self.take_conflict() {
            return Ok(false);
        }
        self.inner.apply_batch(ops).await
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.check(StorageOp::ListKeys)?;
        self.inner.list_keys(prefix).await
    }
}

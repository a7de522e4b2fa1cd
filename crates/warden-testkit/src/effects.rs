//! Composed effects for recovery tests

use crate::faults::FaultyStorage;
use crate::time::ControllableTime;
use async_trait::async_trait;
use std::sync::Arc;
use warden_core::effects::{
    BatchOp, Expiry, HandleRecord, HandleRegistry, HandleResolver, PhysicalTime, PhysicalTimeEffects,
    StorageEffects, StorageError, TimeError,
};
use warden_core::{EncryptionKey, Handle, PublicKey, Result};
use warden_effects::{MemoryHandleRegistry, MemoryStorageHandler};

/// In-memory storage, a controllable clock and a handle registry
///
/// Storage goes through a [`FaultyStorage`] wrapper with no faults enabled;
/// use [`TestEffects::faults`] to inject failures.
#[derive(Clone)]
pub struct TestEffects {
    clock: ControllableTime,
    memory: Arc<MemoryStorageHandler>,
    storage: FaultyStorage<MemoryStorageHandler>,
    handles: MemoryHandleRegistry,
}

impl Default for TestEffects {
    fn default() -> Self {
        Self::with_clock(ControllableTime::default())
    }
}

impl TestEffects {
    /// Fresh effects at the default start time
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh effects sharing `clock`
    pub fn with_clock(clock: ControllableTime) -> Self {
        let shared: Arc<dyn PhysicalTimeEffects> = Arc::new(clock.clone());
        let memory = Arc::new(MemoryStorageHandler::new(Arc::clone(&shared)));
        Self {
            storage: FaultyStorage::new(Arc::clone(&memory)),
            handles: MemoryHandleRegistry::new(shared),
            memory,
            clock,
        }
    }

    /// The clock
    pub fn clock(&self) -> &ControllableTime {
        &self.clock
    }

    /// Underlying storage, bypassing fault injection
    pub fn memory(&self) -> &MemoryStorageHandler {
        &self.memory
    }

    /// Fault controls for the storage seen through this bundle
    pub fn faults(&self) -> &FaultyStorage<MemoryStorageHandler> {
        &self.storage
    }

    /// Handle registry
    pub fn handles(&self) -> &MemoryHandleRegistry {
        &self.handles
    }

    /// Wrap in an `Arc`, the form the recovery service takes
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl PhysicalTimeEffects for TestEffects {
    async fn physical_time(&self) -> std::result::Result<PhysicalTime, TimeError> {
        self.clock.physical_time().await
    }
}

#[async_trait]
impl HandleResolver for TestEffects {
    async fn resolve(&self, handle: &Handle) -> Result<Option<HandleRecord>> {
        self.handles.resolve(handle).await
    }
}

#[async_trait]
impl HandleRegistry for TestEffects {
    async fn register(
        &self,
        handle: Handle,
        signing_key: PublicKey,
        encryption_key: EncryptionKey,
    ) -> Result<HandleRecord> {
        self.handles.register(handle, signing_key, encryption_key).await
    }

    async fn release(&self, handle: &Handle, signing_key: &PublicKey) -> Result<bool> {
        self.handles.release(handle, signing_key).await
    }
}

#[async_trait]
impl StorageEffects for TestEffects {
    async fn retrieve(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StorageError> {
        self.storage.retrieve(key).await
    }

    async fn store(
        &self,
        key: &str,
        value: Vec<u8>,
        expiry: Expiry,
    ) -> std::result::Result<(), StorageError> {
        self.storage.store(key, value, expiry).await
    }

    async fn remove(&self, key: &str) -> std::result::Result<bool, StorageError> {
        self.storage.remove(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Vec<u8>,
        expiry: Expiry,
    ) -> std::result::Result<bool, StorageError> {
        self.storage.compare_and_swap(key, expected, new, expiry).await
    }

    async fn apply_batch(&self, ops: Vec<BatchOp>) -> std::result::Result<bool, StorageError> {
        self.storage.apply_batch(ops).await
    }

    async fn list_keys(&self, prefix: &str) -> std::result::Result<Vec<String>, StorageError> {
        self.storage.list_keys(prefix).await
    }
}

//! Production effect composition

use async_trait::async_trait;
use std::sync::Arc;
use warden_core::effects::{
    BatchOp, Expiry, HandleRecord, HandleRegistry, HandleResolver, PhysicalTime, PhysicalTimeEffects,
    StorageEffects, StorageError, TimeError,
};
use warden_core::{EncryptionKey, Handle, PublicKey, Result};
use warden_effects::{MemoryHandleRegistry, MemoryStorageHandler, RealTimeHandler};

/// Wall clock, in-memory storage and handle registry behind one value
#[derive(Clone)]
pub struct ServerEffects {
    clock: Arc<dyn PhysicalTimeEffects>,
    storage: Arc<MemoryStorageHandler>,
    handles: MemoryHandleRegistry,
}

impl Default for ServerEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerEffects {
    /// Empty store and registry on the system clock
    pub fn new() -> Self {
        let clock: Arc<dyn PhysicalTimeEffects> = Arc::new(RealTimeHandler::new());
        Self {
            storage: Arc::new(MemoryStorageHandler::new(Arc::clone(&clock))),
            handles: MemoryHandleRegistry::new(Arc::clone(&clock)),
            clock,
        }
    }

    /// Backing store, for housekeeping
    pub fn storage(&self) -> &Arc<MemoryStorageHandler> {
        &self.storage
    }

    /// Handle registry
    pub fn handles(&self) -> &MemoryHandleRegistry {
        &self.handles
    }
}

#[async_trait]
impl PhysicalTimeEffects for ServerEffects {
    async fn physical_time(&self) -> std::result::Result<PhysicalTime, TimeError> {
        self.clock.physical_time().await
    }
}

#[async_trait]
impl HandleResolver for ServerEffects {
    async fn resolve(&self, handle: &Handle) -> Result<Option<HandleRecord>> {
        self.handles.resolve(handle).await
    }
}

#[async_trait]
impl HandleRegistry for ServerEffects {
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
impl StorageEffects for ServerEffects {
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

//! In-memory handle registry
//!
//! Mirrors the on-chain key registry: a handle is owned by one signing key,
//! carries that identity's encryption key, and can only be changed or
//! released by its owner.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use warden_core::effects::{HandleRecord, HandleRegistry, HandleResolver, PhysicalTimeEffects};
use warden_core::{EncryptionKey, Handle, PublicKey, Result, WardenError};

/// Handle registry backed by a process-local map
#[derive(Clone)]
pub struct MemoryHandleRegistry {
    records: Arc<RwLock<HashMap<Handle, HandleRecord>>>,
    clock: Arc<dyn PhysicalTimeEffects>,
}

impl MemoryHandleRegistry {
    /// Create an empty registry
    pub fn new(clock: Arc<dyn PhysicalTimeEffects>) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }
}

#[async_trait]
impl HandleResolver for MemoryHandleRegistry {
    async fn resolve(&self, handle: &Handle) -> Result<Option<HandleRecord>> {
        Ok(self.records.read().get(handle).cloned())
    }
}

#[async_trait]
impl HandleRegistry for MemoryHandleRegistry {
    async fn register(
        &self,
        handle: Handle,
        signing_key: PublicKey,
        encryption_key: EncryptionKey,
    ) -> Result<HandleRecord> {
        let now = self.clock.physical_time().await?;
        let mut records = self.records.write();

        if let Some(existing) = records.get_mut(&handle) {
            if existing.signing_key != signing_key {
                return Err(WardenError::handle_taken(&handle));
            }
            existing.encryption_key = encryption_key;
            tracing::info!(handle = %handle, "encryption key updated");
            return Ok(existing.clone());
        }

        let record = HandleRecord {
            handle: handle.clone(),
            signing_key,
            encryption_key,
            registered_at: now.ts_ms,
        };
        records.insert(handle.clone(), record.clone());
        tracing::info!(handle = %handle, owner = %signing_key, "handle registered");
        Ok(record)
    }

    async fn release(&self, handle: &Handle, signing_key: &PublicKey) -> Result<bool> {
        let mut records = self.records.write();
        match records.get(handle) {
            None => Ok(false),
            Some(record) if &record.signing_key != signing_key => Err(WardenError::forbidden(
                format!("only the owner can release {handle}"),
            )),
            Some(_) => {
                records.remove(handle);
                tracing::info!(handle = %handle, "handle released");
                Ok(true)
            }
        }
    }
}

//! Handle registry effect interfaces

use crate::errors::Result;
use crate::identifiers::{EncryptionKey, Handle, PublicKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a handle resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleRecord {
    /// Normalized handle
    pub handle: Handle,
    /// Long-term signing key of the identity
    pub signing_key: PublicKey,
    /// X25519 key others seal to
    pub encryption_key: EncryptionKey,
    /// Registration time, milliseconds since the epoch
    pub registered_at: u64,
}

/// Resolves human-readable handles to identities
#[async_trait]
pub trait HandleResolver: Send + Sync {
    /// Look up a handle; `None` when unregistered
    async fn resolve(&self, handle: &Handle) -> Result<Option<HandleRecord>>;
}

/// Claims and releases handles on behalf of their signing key
///
/// Callers authenticate `signing_key` before calling; the registry only
/// enforces ownership.
#[async_trait]
pub trait HandleRegistry: HandleResolver {
    /// Bind `handle` to `signing_key`
    ///
    /// Re-registering a handle the key already owns replaces its encryption
    /// key. A handle owned by another key fails with `HandleTaken`.
    async fn register(
        &self,
        handle: Handle,
        signing_key: PublicKey,
        encryption_key: EncryptionKey,
    ) -> Result<HandleRecord>;

    /// Unbind `handle`; `false` when it was not registered
    ///
    /// Releasing a handle owned by another key fails with `Forbidden`.
    async fn release(&self, handle: &Handle, signing_key: &PublicKey) -> Result<bool>;
}

#[async_trait]
impl<T: HandleResolver + ?Sized> HandleResolver for std::sync::Arc<T> {
    async fn resolve(&self, handle: &Handle) -> Result<Option<HandleRecord>> {
        (**self).resolve(handle).await
    }
}

#[async_trait]
impl<T: HandleRegistry + ?Sized> HandleRegistry for std::sync::Arc<T> {
    async fn register(
        &self,
        handle: Handle,
        signing_key: PublicKey,
        encryption_key: EncryptionKey,
    ) -> Result<HandleRecord> {
        (**self).register(handle, signing_key, encryption_key).await
    }

    async fn release(&self, handle: &Handle, signing_key: &PublicKey) -> Result<bool> {
        (**self).release(handle, signing_key).await
    }
}

//! Effects required by recovery operations
//!
//! The recovery service needs durable storage, a wall clock and the handle
//! registry, and nothing else. In particular it has no access to any
//! decryption or reconstruction capability.

use warden_core::effects::{HandleRegistry, PhysicalTimeEffects, StorageEffects};

/// Composed effects for the recovery service
pub trait RecoveryEffects: StorageEffects + PhysicalTimeEffects + HandleRegistry + Send + Sync {}

/// Blanket implementation for any type that implements all required traits.
impl<T> RecoveryEffects for T where
    T: StorageEffects + PhysicalTimeEffects + HandleRegistry + Send + Sync
{
}

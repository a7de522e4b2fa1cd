//! Secondary index from guardian to candidate sessions
//!
//! Lets a guardian poll without scanning every live session. The index is
//! a superset: ids are added when a session is created and removed once the
//! guardian submits, and readers always confirm against the session record
//! and prune whatever no longer applies.

use crate::keys;
use crate::record::{load, update, Update};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use warden_core::effects::{Expiry, StorageEffects};
use warden_core::{PublicKey, RecoveryId, Result};

type Candidates = BTreeSet<RecoveryId>;

/// Guardian-to-session index
pub struct GuardianIndex<S: ?Sized> {
    storage: Arc<S>,
    max_attempts: u32,
}

impl<S: ?Sized> Clone for GuardianIndex<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: StorageEffects + ?Sized> GuardianIndex<S> {
    /// Index over `storage`, retrying contended updates `max_attempts` times
    pub fn new(storage: Arc<S>, max_attempts: u32) -> Self {
        Self {
            storage,
            max_attempts,
        }
    }

    /// Candidate session ids for `guardian`
    pub async fn candidates(&self, guardian: &PublicKey) -> Result<Candidates> {
        Ok(load(&*self.storage, &keys::guardian_index(guardian))
            .await?
            .unwrap_or_default())
    }

    /// Add `id` for `guardian`, extending the entry's lifetime to `ttl`
    pub async fn add(&self, guardian: &PublicKey, id: RecoveryId, ttl: Duration) -> Result<()> {
        update(
            &*self.storage,
            &keys::guardian_index(guardian),
            self.max_attempts,
            |current: Option<Candidates>| {
                let mut ids = current.unwrap_or_default();
                ids.insert(id);
                Ok(Update::Write {
                    value: ids,
                    expiry: Expiry::After(ttl),
                    output: (),
                })
            },
        )
        .await
    }

    /// Remove `ids` for `guardian`
    pub async fn remove(&self, guardian: &PublicKey, ids: &Candidates) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        update(
            &*self.storage,
            &keys::guardian_index(guardian),
            self.max_attempts,
            |current: Option<Candidates>| {
                let Some(mut current) = current else {
                    return Ok(Update::Skip(()));
                };
                let before = current.len();
                current.retain(|id| !ids.contains(id));
                if current.len() == before {
                    return Ok(Update::Skip(()));
                }
                Ok(Update::Write {
                    value: current,
                    expiry: Expiry::Keep,
                    output: (),
                })
            },
        )
        .await
    }
}

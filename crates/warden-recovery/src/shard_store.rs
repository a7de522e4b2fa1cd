//! Owner configurations and per-guardian sealed shards
//!
//! A configuration and its shards are always written or removed in a
//! single batch guarded by the configuration bytes that batch was planned
//! against. Stale shards are found by listing the owner's shard prefix, so
//! the stored shard set never disagrees with the stored guardian list even
//! when owners reconfigure concurrently.

use crate::keys;
use crate::record::{decode, encode, load};
use crate::types::{RecoveryConfig, ShardRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use warden_core::effects::{BatchOp, Expiry, StorageEffects};
use warden_core::{PublicKey, Result, SealedShard, WardenError};

/// A configuration together with every shard of its generation
pub type ConfigSnapshot = (RecoveryConfig, BTreeMap<PublicKey, SealedShard>);

/// Storage access for configurations and shards
pub struct ShardStore<S: ?Sized> {
    storage: Arc<S>,
    max_attempts: u32,
}

impl<S: ?Sized> Clone for ShardStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: StorageEffects + ?Sized> ShardStore<S> {
    /// Wrap a storage handler, retrying contended writes `max_attempts` times
    pub fn new(storage: Arc<S>, max_attempts: u32) -> Self {
        Self {
            storage,
            max_attempts,
        }
    }

    /// Current configuration for `owner`
    pub async fn load_config(&self, owner: &PublicKey) -> Result<Option<RecoveryConfig>> {
        load(&*self.storage, &keys::config(owner)).await
    }

    /// Stored shard of `guardian` for `owner`
    pub async fn load_shard(
        &self,
        owner: &PublicKey,
        guardian: &PublicKey,
    ) -> Result<Option<ShardRecord>> {
        load(&*self.storage, &keys::shard(owner, guardian)).await
    }

    /// Current configuration and the shards written with it
    ///
    /// Shards from another generation mean a reconfiguration landed between
    /// reads; the whole read is repeated.
    pub async fn load_snapshot(&self, owner: &PublicKey) -> Result<Option<ConfigSnapshot>> {
        for attempt in 1..=self.max_attempts {
            let Some(config) = self.load_config(owner).await? else {
                return Ok(None);
            };
            if let Some(shards) = self.shards_of(&config).await? {
                return Ok(Some((config, shards)));
            }

            let current = self.load_config(owner).await?;
            if current.is_some_and(|c| c.generation == config.generation) {
                tracing::error!(owner = %owner, "configuration is missing shards");
                return Err(WardenError::internal(format!(
                    "configuration of {owner} is missing shards"
                )));
            }
            tracing::debug!(owner = %owner, attempt, "configuration changed while reading shards");
        }
        tracing::warn!(owner = %owner, "configuration kept changing while reading shards");
        Err(WardenError::storage(format!(
            "could not read a stable configuration for {owner}"
        )))
    }

    async fn shards_of(
        &self,
        config: &RecoveryConfig,
    ) -> Result<Option<BTreeMap<PublicKey, SealedShard>>> {
        let mut shards = BTreeMap::new();
        for guardian in &config.guardians {
            match self.load_shard(&config.owner_pubkey, guardian).await? {
                Some(record) if record.generation == config.generation => {
                    shards.insert(*guardian, record.encrypted_shard);
                }
                _ => return Ok(None),
            }
        }
        Ok(Some(shards))
    }

    /// Replace the owner's configuration and every shard in one batch
    ///
    /// Any other shard stored under the owner is deleted in the same batch.
    /// Returns the configuration that was replaced.
    pub async fn replace(
        &self,
        config: &RecoveryConfig,
        shards: &[ShardRecord],
    ) -> Result<Option<RecoveryConfig>> {
        let owner = &config.owner_pubkey;
        if shards.len() != config.guardians.len()
            || shards.iter().any(|s| {
                s.owner_pubkey != *owner
                    || s.generation != config.generation
                    || !config.guardians.contains(&s.guardian_pubkey)
            })
        {
            return Err(WardenError::internal(
                "shard records do not match the configured guardians",
            ));
        }

        let config_key = keys::config(owner);
        let config_bytes = encode(config)?;
        let mut writes = Vec::with_capacity(shards.len());
        for shard in shards {
            writes.push((keys::shard(owner, &shard.guardian_pubkey), encode(shard)?));
        }
        let fresh: BTreeSet<&str> = writes.iter().map(|(key, _)| key.as_str()).collect();

        for attempt in 1..=self.max_attempts {
            let current = self.storage.retrieve(&config_key).await?;
            let previous = current
                .as_deref()
                .map(|bytes| decode::<RecoveryConfig>(&config_key, bytes))
                .transpose()?;
            let stored = self.storage.list_keys(&keys::shard_prefix(owner)).await?;

            let mut ops = Vec::with_capacity(2 + writes.len() + stored.len());
            ops.push(BatchOp::Check {
                key: config_key.clone(),
                expected: current,
            });
            ops.push(BatchOp::Put {
                key: config_key.clone(),
                value: config_bytes.clone(),
                expiry: Expiry::Never,
            });
            ops.extend(writes.iter().map(|(key, value)| BatchOp::Put {
                key: key.clone(),
                value: value.clone(),
                expiry: Expiry::Never,
            }));
            ops.extend(
                stored
                    .into_iter()
                    .filter(|key| !fresh.contains(key.as_str()))
                    .map(|key| BatchOp::Delete { key }),
            );

            if self.storage.apply_batch(ops).await? {
                return Ok(previous);
            }
            tracing::debug!(owner = %owner, attempt, "configuration changed concurrently, retrying");
        }
        tracing::warn!(owner = %owner, "configuration write abandoned after repeated conflicts");
        Err(WardenError::storage(format!(
            "could not store the configuration of {owner}"
        )))
    }

    /// Delete the owner's configuration and every shard stored under it
    ///
    /// Returns `false` when nothing was configured.
    pub async fn remove(&self, owner: &PublicKey) -> Result<bool> {
        let config_key = keys::config(owner);
        for attempt in 1..=self.max_attempts {
            let Some(current) = self.storage.retrieve(&config_key).await? else {
                return Ok(false);
            };
            let stored = self.storage.list_keys(&keys::shard_prefix(owner)).await?;

            let mut ops = Vec::with_capacity(2 + stored.len());
            ops.push(BatchOp::Check {
                key: config_key.clone(),
                expected: Some(current),
            });
            ops.push(BatchOp::Delete {
                key: config_key.clone(),
            });
            ops.extend(stored.into_iter().map(|key| BatchOp::Delete { key }));

            if self.storage.apply_batch(ops).await? {
                return Ok(true);
            }
            tracing::debug!(owner = %owner, attempt, "configuration changed concurrently, retrying");
        }
        tracing::warn!(owner = %owner, "configuration removal abandoned after repeated conflicts");
        Err(WardenError::storage(format!(
            "could not remove the configuration of {owner}"
        )))
    }
}

//! Records and views of the recovery protocol
//!
//! Every shard-bearing field is a [`SealedShard`], which can only be built
//! from ciphertext bytes. Nothing in this crate can produce or consume a
//! plaintext share.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;
use warden_core::{
    EncryptionKey, Handle, OwnerRef, PublicKey, RecoveryId, Result, SealedShard, WardenError,
};
use warden_signature::RequestAuth;

/// Share indices are single bytes, so at most 255 guardians
pub const MAX_GUARDIANS: usize = 255;

/// Smallest threshold that requires more than one guardian
pub const MIN_THRESHOLD: usize = 2;

/// Ordered set of guardian keys, non-empty and free of duplicates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PublicKey>", into = "Vec<PublicKey>")]
pub struct GuardianSet {
    guardians: Vec<PublicKey>,
}

impl GuardianSet {
    /// Validate and wrap a guardian list
    pub fn new(guardians: Vec<PublicKey>) -> Result<Self> {
        if guardians.is_empty() {
            return Err(WardenError::validation("at least one guardian is required"));
        }
        if guardians.len() > MAX_GUARDIANS {
            return Err(WardenError::validation(format!(
                "at most {MAX_GUARDIANS} guardians are supported, got {}",
                guardians.len()
            )));
        }
        let mut seen = HashSet::with_capacity(guardians.len());
        if let Some(dup) = guardians.iter().find(|g| !seen.insert(**g)) {
            return Err(WardenError::validation(format!("duplicate guardian {dup}")));
        }
        Ok(Self { guardians })
    }

    /// Number of guardians.
    pub fn len(&self) -> usize {
        self.guardians.len()
    }

    /// Always false for a constructed set
    pub fn is_empty(&self) -> bool {
        self.guardians.is_empty()
    }

    /// Whether `guardian` is a member
    pub fn contains(&self, guardian: &PublicKey) -> bool {
        self.guardians.contains(guardian)
    }

    /// Iterate in configured order
    pub fn iter(&self) -> impl Iterator<Item = &PublicKey> {
        self.guardians.iter()
    }

    /// Guardians as a slice
    pub fn as_slice(&self) -> &[PublicKey] {
        &self.guardians
    }
}

impl TryFrom<Vec<PublicKey>> for GuardianSet {
    type Error = WardenError;

    fn try_from(guardians: Vec<PublicKey>) -> Result<Self> {
        Self::new(guardians)
    }
}

impl From<GuardianSet> for Vec<PublicKey> {
    fn from(set: GuardianSet) -> Self {
        set.guardians
    }
}

impl<'a> IntoIterator for &'a GuardianSet {
    type Item = &'a PublicKey;
    type IntoIter = std::slice::Iter<'a, PublicKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.guardians.iter()
    }
}

/// An owner's stored recovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryConfig {
    pub owner_pubkey: PublicKey,
    pub guardians: GuardianSet,
    pub threshold: usize,
    pub owner_encryption_key: EncryptionKey,
    /// Milliseconds since the epoch
    pub configured_at: u64,
    /// Fresh on every configure and copied onto each shard written with it
    pub generation: Uuid,
}

/// A guardian's sealed shard for one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardRecord {
    pub owner_pubkey: PublicKey,
    pub guardian_pubkey: PublicKey,
    pub encrypted_shard: SealedShard,
    pub stored_at: u64,
    /// Generation of the configuration this shard belongs to
    pub generation: Uuid,
}

/// Lifecycle of a recovery session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Waiting for guardians
    Pending,
    /// Threshold reached; shards can be fetched
    Ready,
    /// Device reported successful reconstruction
    Completed,
}

impl SessionStatus {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shard a guardian re-sealed to the session's temporary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedShard {
    pub encrypted_shard: SealedShard,
    /// Sender key the device needs to open `encrypted_shard`
    pub guardian_encryption_pubkey: EncryptionKey,
    pub submitted_at: u64,
}

/// Ephemeral record of one recovery attempt
///
/// `threshold`, `guardians` and every guardian's stored shard are copied
/// from one configuration generation when the session is created, so
/// reconfiguring does not change a session in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySession {
    pub recovery_id: RecoveryId,
    pub owner_pubkey: PublicKey,
    pub temp_pubkey: EncryptionKey,
    pub threshold: usize,
    pub guardians: GuardianSet,
    pub owner_encryption_pubkey: EncryptionKey,
    /// Each guardian's shard as stored at creation, still sealed to them
    pub guardian_shards: BTreeMap<PublicKey, SealedShard>,
    pub submitted_shards: BTreeMap<PublicKey, SubmittedShard>,
    pub status: SessionStatus,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
}

impl RecoverySession {
    /// Fresh pending session snapshotting `config` and its shards
    pub fn new(
        config: &RecoveryConfig,
        guardian_shards: BTreeMap<PublicKey, SealedShard>,
        temp_pubkey: EncryptionKey,
        now: u64,
    ) -> Self {
        Self {
            recovery_id: RecoveryId::new_random(),
            owner_pubkey: config.owner_pubkey,
            temp_pubkey,
            threshold: config.threshold,
            guardians: config.guardians.clone(),
            owner_encryption_pubkey: config.owner_encryption_key,
            guardian_shards,
            submitted_shards: BTreeMap::new(),
            status: SessionStatus::Pending,
            created_at: now,
            completed_at: None,
        }
    }

    /// Distinct guardians that have submitted
    pub fn submitted_count(&self) -> usize {
        self.submitted_shards.len()
    }

    /// Whether `guardian` already submitted
    pub fn has_submitted(&self, guardian: &PublicKey) -> bool {
        self.submitted_shards.contains_key(guardian)
    }

    /// Whether `guardian` should still be asked for a shard
    pub fn awaits(&self, guardian: &PublicKey) -> bool {
        self.status == SessionStatus::Pending
            && self.guardians.contains(guardian)
            && !self.has_submitted(guardian)
    }

    /// Insert or overwrite a guardian's shard and recompute readiness
    ///
    /// Accepted while pending or ready. Returns true when this submission
    /// moved the session to ready.
    pub fn record_submission(&mut self, guardian: PublicKey, shard: SubmittedShard) -> Result<bool> {
        if !self.guardians.contains(&guardian) {
            return Err(WardenError::not_a_guardian(guardian));
        }
        if self.status == SessionStatus::Completed {
            return Err(WardenError::session_closed(format!(
                "recovery {} is already completed",
                self.recovery_id
            )));
        }
        self.submitted_shards.insert(guardian, shard);
        let became_ready =
            self.status == SessionStatus::Pending && self.submitted_count() >= self.threshold;
        if became_ready {
            self.status = SessionStatus::Ready;
        }
        Ok(became_ready)
    }

    /// Progress view for status polling
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            recovery_id: self.recovery_id,
            submitted_count: self.submitted_count(),
            threshold: self.threshold,
            status: self.status,
            ready: self.status != SessionStatus::Pending,
        }
    }
}

/// One guardian's upload at configuration time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianUpload {
    pub pubkey: PublicKey,
    pub encrypted_shard: SealedShard,
}

/// Input to [`configure`](crate::RecoveryService::configure)
#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    pub guardians: Vec<GuardianUpload>,
    pub threshold: usize,
    pub owner_recovery_encryption_key: EncryptionKey,
    pub auth: RequestAuth,
}

/// Confirmation returned by configure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureReceipt {
    pub guardian_count: usize,
    pub threshold: usize,
}

/// Input to [`initiate`](crate::RecoveryService::initiate)
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub owner: OwnerRef,
    pub temp_pubkey: EncryptionKey,
}

/// Session handed to the recovering device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    pub recovery_id: RecoveryId,
    pub owner_pubkey: PublicKey,
    pub threshold: usize,
    pub guardians: Vec<PublicKey>,
    pub status: SessionStatus,
    /// Temporary key guardians will seal to; differs from the caller's when
    /// an existing session was reused
    pub temp_pubkey: EncryptionKey,
    /// True when an already pending session was returned
    pub reused: bool,
}

/// Progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub recovery_id: RecoveryId,
    pub submitted_count: usize,
    pub threshold: usize,
    pub status: SessionStatus,
    pub ready: bool,
}

/// A session waiting on the polling guardian
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub recovery_id: RecoveryId,
    pub owner_pubkey: PublicKey,
    pub temp_pubkey: EncryptionKey,
    pub owner_encryption_pubkey: EncryptionKey,
    pub threshold: usize,
    pub submitted_count: usize,
    /// The guardian's own shard, still sealed to the guardian
    pub encrypted_shard: SealedShard,
    pub created_at: u64,
}

/// Input to [`submit_shard`](crate::RecoveryService::submit_shard)
#[derive(Debug, Clone)]
pub struct SubmitShardRequest {
    pub recovery_id: RecoveryId,
    pub encrypted_shard: SealedShard,
    pub guardian_encryption_pubkey: EncryptionKey,
    pub auth: RequestAuth,
}

/// Result of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub submitted_count: usize,
    pub threshold: usize,
    pub ready: bool,
}

/// Everything the device needs to reconstruct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedShards {
    pub recovery_id: RecoveryId,
    pub threshold: usize,
    pub status: SessionStatus,
    pub submitted_shards: BTreeMap<PublicKey, SubmittedShard>,
}

/// Acknowledgement of complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionAck {
    pub recovery_id: RecoveryId,
    pub status: SessionStatus,
}

/// Acknowledgement of disable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableAck {
    /// False when there was nothing to remove
    pub removed: bool,
}

/// Input to [`register_handle`](crate::RecoveryService::register_handle)
#[derive(Debug, Clone)]
pub struct RegisterHandleRequest {
    pub handle: Handle,
    /// Key the handle resolves to for sealing
    pub encryption_key: EncryptionKey,
    pub auth: RequestAuth,
}

/// Input to [`release_handle`](crate::RecoveryService::release_handle)
#[derive(Debug, Clone)]
pub struct ReleaseHandleRequest {
    pub handle: Handle,
    pub auth: RequestAuth,
}

/// Acknowledgement of a handle release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseAck {
    /// False when the handle was not registered
    pub released: bool,
}

/// Public view of a configuration, without shards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationView {
    pub owner_pubkey: PublicKey,
    pub guardians: Vec<PublicKey>,
    pub threshold: usize,
    pub owner_encryption_key: EncryptionKey,
    pub configured_at: u64,
}

impl From<&RecoveryConfig> for ConfigurationView {
    fn from(config: &RecoveryConfig) -> Self {
        Self {
            owner_pubkey: config.owner_pubkey,
            guardians: config.guardians.as_slice().to_vec(),
            threshold: config.threshold,
            owner_encryption_key: config.owner_encryption_key,
            configured_at: config.configured_at,
        }
    }
}

//! Recovery operations
//!
//! `RecoveryService` is the server-side entry point for every step of the
//! protocol. Authenticated operations pass through the signature gate before
//! any storage access; validation failures never touch storage either.

use crate::effects::RecoveryEffects;
use crate::guardian_index::GuardianIndex;
use crate::policy::RecoveryPolicy;
use crate::session::{Opened, SessionManager};
use crate::shard_store::ShardStore;
use crate::types::{
    CompletionAck, ConfigurationView, ConfigureReceipt, ConfigureRequest, DisableAck,
    FetchedShards, GuardianSet, InitiateRequest, InitiateResponse, PendingRequest,
    RecoveryConfig, RecoverySession, RegisterHandleRequest, ReleaseAck, ReleaseHandleRequest,
    SessionProgress, SessionStatus, ShardRecord, SubmissionReceipt, SubmitShardRequest,
    SubmittedShard, MIN_THRESHOLD,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;
use warden_core::effects::{HandleRecord, PhysicalTime};
use warden_core::{Handle, OwnerRef, PublicKey, RecoveryId, Result, SealedShard, WardenError};
use warden_signature::{RequestAuth, SignatureGate, SignedAction};

/// Guardian recovery service over a set of effects
pub struct RecoveryService<E: ?Sized> {
    effects: Arc<E>,
    gate: SignatureGate,
    policy: RecoveryPolicy,
    shards: ShardStore<E>,
    sessions: SessionManager<E>,
    index: GuardianIndex<E>,
}

impl<E: ?Sized> Clone for RecoveryService<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            gate: self.gate,
            policy: self.policy,
            shards: self.shards.clone(),
            sessions: self.sessions.clone(),
            index: self.index.clone(),
        }
    }
}

impl<E: RecoveryEffects + ?Sized> RecoveryService<E> {
    /// Service with the default policy
    pub fn new(effects: Arc<E>) -> Self {
        Self::with_policy(effects, RecoveryPolicy::default())
    }

    /// Service with an explicit policy
    pub fn with_policy(effects: Arc<E>, policy: RecoveryPolicy) -> Self {
        Self {
            gate: SignatureGate::new(policy.max_clock_skew),
            shards: ShardStore::new(Arc::clone(&effects), policy.max_update_attempts),
            sessions: SessionManager::new(Arc::clone(&effects), policy),
            index: GuardianIndex::new(Arc::clone(&effects), policy.max_update_attempts),
            effects,
            policy,
        }
    }

    /// Active policy
    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    async fn now(&self) -> Result<PhysicalTime> {
        Ok(self.effects.physical_time().await?)
    }

    async fn authorize(&self, auth: &RequestAuth, action: &SignedAction) -> Result<PublicKey> {
        let now = self.now().await?;
        self.gate.authorize(auth, action, now)
    }

    /// Store the owner's guardian set, threshold and sealed shards
    ///
    /// Replaces any previous configuration together with all of its shards.
    pub async fn configure(&self, request: ConfigureRequest) -> Result<ConfigureReceipt> {
        let threshold = request.threshold;
        let owner = self
            .authorize(&request.auth, &SignedAction::Configure { threshold })
            .await?;

        let guardians =
            GuardianSet::new(request.guardians.iter().map(|g| g.pubkey).collect())?;
        if guardians.contains(&owner) {
            return Err(WardenError::validation("owner cannot be their own guardian"));
        }
        if threshold < MIN_THRESHOLD || threshold > guardians.len() {
            return Err(WardenError::validation(format!(
                "threshold must be between {MIN_THRESHOLD} and {}, got {threshold}",
                guardians.len()
            )));
        }
        if let Some(empty) = request.guardians.iter().find(|g| g.encrypted_shard.is_empty()) {
            return Err(WardenError::validation(format!(
                "empty shard for guardian {}",
                empty.pubkey
            )));
        }

        let now = self.now().await?.ts_ms;
        let generation = Uuid::new_v4();
        let config = RecoveryConfig {
            owner_pubkey: owner,
            guardians,
            threshold,
            owner_encryption_key: request.owner_recovery_encryption_key,
            configured_at: now,
            generation,
        };
        let records: Vec<ShardRecord> = request
            .guardians
            .into_iter()
            .map(|g| ShardRecord {
                owner_pubkey: owner,
                guardian_pubkey: g.pubkey,
                encrypted_shard: g.encrypted_shard,
                stored_at: now,
                generation,
            })
            .collect();

        let previous = match self.shards.replace(&config, &records).await {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "configuration write failed");
                return Err(e);
            }
        };

        tracing::info!(
            owner = %owner,
            guardians = config.guardians.len(),
            threshold,
            replaced = previous.is_some(),
            "recovery configured"
        );
        Ok(ConfigureReceipt {
            guardian_count: config.guardians.len(),
            threshold,
        })
    }

    /// Start recovery for an owner, or return their pending session
    ///
    /// Unauthenticated: the caller has lost the owner's signing key.
    pub async fn initiate(&self, request: InitiateRequest) -> Result<InitiateResponse> {
        let owner = self.resolve_owner(&request.owner).await?;
        let snapshot = self
            .shards
            .load_snapshot(&owner)
            .await?
            .ok_or_else(|| {
                WardenError::not_configured(format!("no recovery configured for {owner}"))
            })?;

        let now = self.now().await?.ts_ms;
        let opened = self.sessions.open(&snapshot, request.temp_pubkey, now).await?;
        let session = opened.session();

        for guardian in session.guardians.iter().filter(|g| session.awaits(g)) {
            self.index
                .add(guardian, session.recovery_id, self.policy.session_ttl)
                .await?;
        }

        match &opened {
            Opened::Created(_) => tracing::info!(
                owner = %owner,
                recovery_id = %session.recovery_id,
                "recovery initiated"
            ),
            Opened::Reused(_) => tracing::info!(
                owner = %owner,
                recovery_id = %session.recovery_id,
                "pending recovery reused"
            ),
        }

        Ok(InitiateResponse {
            recovery_id: session.recovery_id,
            owner_pubkey: session.owner_pubkey,
            threshold: session.threshold,
            guardians: session.guardians.as_slice().to_vec(),
            status: session.status,
            temp_pubkey: session.temp_pubkey,
            reused: opened.is_reused(),
        })
    }

    async fn resolve_owner(&self, owner: &OwnerRef) -> Result<PublicKey> {
        match owner {
            OwnerRef::PublicKey(key) => Ok(*key),
            OwnerRef::Handle(handle) => self
                .effects
                .resolve(handle)
                .await?
                .map(|record| record.signing_key)
                .ok_or_else(|| WardenError::not_configured(format!("unknown handle {handle}"))),
        }
    }

    /// Progress of a session
    pub async fn session_status(&self, id: &RecoveryId) -> Result<SessionProgress> {
        Ok(self.sessions.load(id).await?.progress())
    }

    /// Pending sessions that still need the signing guardian's shard
    ///
    /// Each entry carries the guardian's shard as it was stored when the
    /// session started, still sealed to the guardian. Ordered oldest first.
    pub async fn guardian_pending(&self, auth: &RequestAuth) -> Result<Vec<PendingRequest>> {
        let guardian = self.authorize(auth, &SignedAction::Pending).await?;

        let mut pending = Vec::new();
        let mut stale = BTreeSet::new();
        for id in self.index.candidates(&guardian).await? {
            let Some(session) = self.sessions.get(&id).await? else {
                stale.insert(id);
                continue;
            };
            if !session.awaits(&guardian) {
                stale.insert(id);
                continue;
            }
            match session.guardian_shards.get(&guardian) {
                Some(shard) => pending.push(pending_request(&session, shard.clone())),
                None => tracing::debug!(
                    guardian = %guardian,
                    recovery_id = %id,
                    "session holds no shard for guardian, skipping"
                ),
            }
        }

        if let Err(e) = self.index.remove(&guardian, &stale).await {
            tracing::warn!(guardian = %guardian, error = %e, "failed to prune guardian index");
        }

        pending.sort_by_key(|p| (p.created_at, p.recovery_id));
        Ok(pending)
    }

    /// Accept a guardian's re-sealed shard
    pub async fn submit_shard(&self, request: SubmitShardRequest) -> Result<SubmissionReceipt> {
        let id = request.recovery_id;
        let guardian = self
            .authorize(&request.auth, &SignedAction::Submit { recovery_id: id })
            .await?;
        if request.encrypted_shard.is_empty() {
            return Err(WardenError::validation("encrypted shard must not be empty"));
        }

        let shard = SubmittedShard {
            encrypted_shard: request.encrypted_shard,
            guardian_encryption_pubkey: request.guardian_encryption_pubkey,
            submitted_at: self.now().await?.ts_ms,
        };
        let (session, became_ready) = match self.sessions.submit(&id, guardian, shard).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(guardian = %guardian, recovery_id = %id, error = %e, "submission rejected");
                return Err(e);
            }
        };

        if let Err(e) = self.index.remove(&guardian, &BTreeSet::from([id])).await {
            tracing::warn!(guardian = %guardian, recovery_id = %id, error = %e, "failed to update guardian index");
        }

        tracing::info!(
            guardian = %guardian,
            recovery_id = %id,
            submitted = session.submitted_count(),
            threshold = session.threshold,
            "shard submitted"
        );
        if became_ready {
            tracing::info!(recovery_id = %id, "recovery ready");
        }

        Ok(SubmissionReceipt {
            submitted_count: session.submitted_count(),
            threshold: session.threshold,
            ready: session.status != SessionStatus::Pending,
        })
    }

    /// All submitted shards of a ready or completed session
    pub async fn fetch_shards(&self, id: &RecoveryId) -> Result<FetchedShards> {
        let session = self.sessions.load(id).await?;
        if session.status == SessionStatus::Pending {
            return Err(WardenError::not_ready(
                session.submitted_count(),
                session.threshold,
            ));
        }
        Ok(FetchedShards {
            recovery_id: session.recovery_id,
            threshold: session.threshold,
            status: session.status,
            submitted_shards: session.submitted_shards,
        })
    }

    /// Mark a ready session completed after local reconstruction
    pub async fn complete(&self, id: &RecoveryId) -> Result<CompletionAck> {
        let now = self.now().await?.ts_ms;
        let (session, changed) = self.sessions.complete(id, now).await?;
        if changed {
            tracing::info!(recovery_id = %id, owner = %session.owner_pubkey, "recovery completed");
        }
        Ok(CompletionAck {
            recovery_id: session.recovery_id,
            status: session.status,
        })
    }

    /// Remove the signer's configuration and shards
    ///
    /// Idempotent. Sessions already in flight keep their snapshot and run
    /// out on their own lifetime.
    pub async fn disable(&self, auth: &RequestAuth) -> Result<DisableAck> {
        let owner = self.authorize(auth, &SignedAction::Disable).await?;
        let removed = self.shards.remove(&owner).await?;
        if removed {
            tracing::info!(owner = %owner, "recovery disabled");
        }
        Ok(DisableAck { removed })
    }

    /// Public view of an owner's configuration
    pub async fn configuration(&self, owner: &PublicKey) -> Result<ConfigurationView> {
        self.shards
            .load_config(owner)
            .await?
            .map(|config| ConfigurationView::from(&config))
            .ok_or_else(|| {
                WardenError::not_configured(format!("no recovery configured for {owner}"))
            })
    }

    /// Claim a handle for the signer, or rotate the encryption key behind a
    /// handle the signer already holds
    pub async fn register_handle(&self, request: RegisterHandleRequest) -> Result<HandleRecord> {
        let action = SignedAction::RegisterHandle {
            handle: request.handle.clone(),
            encryption_key: request.encryption_key,
        };
        let signer = self.authorize(&request.auth, &action).await?;
        self.effects
            .register(request.handle, signer, request.encryption_key)
            .await
    }

    /// Give up a handle held by the signer
    pub async fn release_handle(&self, request: ReleaseHandleRequest) -> Result<ReleaseAck> {
        let action = SignedAction::ReleaseHandle {
            handle: request.handle.clone(),
        };
        let signer = self.authorize(&request.auth, &action).await?;
        let released = self.effects.release(&request.handle, &signer).await?;
        Ok(ReleaseAck { released })
    }

    /// Identity registered under `handle`
    pub async fn lookup_handle(&self, handle: &Handle) -> Result<HandleRecord> {
        self.effects
            .resolve(handle)
            .await?
            .ok_or_else(|| WardenError::not_configured(format!("unknown handle {handle}")))
    }
}

fn pending_request(session: &RecoverySession, encrypted_shard: SealedShard) -> PendingRequest {
    PendingRequest {
        recovery_id: session.recovery_id,
        owner_pubkey: session.owner_pubkey,
        temp_pubkey: session.temp_pubkey,
        owner_encryption_pubkey: session.owner_encryption_pubkey,
        threshold: session.threshold,
        submitted_count: session.submitted_count(),
        encrypted_shard,
        created_at: session.created_at,
    }
}

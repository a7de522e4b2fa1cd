//! Recovery session lifecycle
//!
//! Sessions are single JSON records mutated only through compare-and-swap,
//! so concurrent guardian submissions never overwrite each other. At most
//! one pending session per owner is published through the owner's
//! pending-owner pointer, which is itself claimed with compare-and-swap.

use crate::keys;
use crate::policy::RecoveryPolicy;
use crate::record::{decode, encode, load, update, Update};
use crate::shard_store::ConfigSnapshot;
use crate::types::{RecoverySession, SessionStatus, SubmittedShard};
use std::sync::Arc;
use warden_core::effects::{Expiry, StorageEffects};
use warden_core::{EncryptionKey, PublicKey, RecoveryId, Result, WardenError};

/// Result of [`SessionManager::open`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    /// A new session was created and published
    Created(RecoverySession),
    /// The owner already had a pending session
    Reused(RecoverySession),
}

impl Opened {
    /// The session, however it was obtained
    pub fn session(&self) -> &RecoverySession {
        match self {
            Self::Created(session) | Self::Reused(session) => session,
        }
    }

    /// Whether an existing session was returned
    pub fn is_reused(&self) -> bool {
        matches!(self, Self::Reused(_))
    }
}

/// Creates, reads and mutates sessions
pub struct SessionManager<S: ?Sized> {
    storage: Arc<S>,
    policy: RecoveryPolicy,
}

impl<S: ?Sized> Clone for SessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            policy: self.policy,
        }
    }
}

impl<S: StorageEffects + ?Sized> SessionManager<S> {
    /// Manager over `storage` with the given policy
    pub fn new(storage: Arc<S>, policy: RecoveryPolicy) -> Self {
        Self { storage, policy }
    }

    /// Load a live session
    pub async fn get(&self, id: &RecoveryId) -> Result<Option<RecoverySession>> {
        load(&*self.storage, &keys::session(id)).await
    }

    /// Load a live session or fail with `SessionNotFound`
    pub async fn load(&self, id: &RecoveryId) -> Result<RecoverySession> {
        self.get(id)
            .await?
            .ok_or_else(|| WardenError::session_not_found(id))
    }

    /// The owner's published session, if it is still pending
    pub async fn find_pending(&self, owner: &PublicKey) -> Result<Option<RecoverySession>> {
        let Some(id) = load::<_, RecoveryId>(&*self.storage, &keys::pending_owner(owner)).await?
        else {
            return Ok(None);
        };
        Ok(self
            .get(&id)
            .await?
            .filter(|session| session.status == SessionStatus::Pending))
    }

    /// Return the owner's pending session or create and publish a new one
    ///
    /// A new session snapshots the configuration and its shards. It is
    /// stored before it is published. If another caller publishes a pending
    /// session first, the unpublished one is deleted and the winner is
    /// returned.
    pub async fn open(
        &self,
        snapshot: &ConfigSnapshot,
        temp_pubkey: EncryptionKey,
        now: u64,
    ) -> Result<Opened> {
        let (config, guardian_shards) = snapshot;
        let owner = &config.owner_pubkey;
        let pointer_key = keys::pending_owner(owner);
        let mut fresh: Option<RecoverySession> = None;

        for attempt in 1..=self.policy.max_update_attempts {
            let published = self.storage.retrieve(&pointer_key).await?;
            if let Some(bytes) = published.as_deref() {
                let id: RecoveryId = decode(&pointer_key, bytes)?;
                if let Some(existing) = self.get(&id).await? {
                    if existing.status == SessionStatus::Pending {
                        if let Some(unpublished) = &fresh {
                            self.discard(&unpublished.recovery_id).await;
                        }
                        return Ok(Opened::Reused(existing));
                    }
                }
            }

            let session = match &fresh {
                Some(session) => session.clone(),
                None => {
                    let session =
                        RecoverySession::new(config, guardian_shards.clone(), temp_pubkey, now);
                    self.storage
                        .store(
                            &keys::session(&session.recovery_id),
                            encode(&session)?,
                            Expiry::After(self.policy.session_ttl),
                        )
                        .await?;
                    fresh = Some(session.clone());
                    session
                }
            };

            let claimed = self
                .storage
                .compare_and_swap(
                    &pointer_key,
                    published.as_deref(),
                    encode(&session.recovery_id)?,
                    Expiry::After(self.policy.session_ttl),
                )
                .await?;
            if claimed {
                return Ok(Opened::Created(session));
            }
            tracing::debug!(owner = %owner, attempt, "pending session pointer changed, retrying");
        }

        if let Some(unpublished) = &fresh {
            self.discard(&unpublished.recovery_id).await;
        }
        tracing::warn!(owner = %owner, "could not publish a recovery session");
        Err(WardenError::storage(format!(
            "could not publish a session for {owner}"
        )))
    }

    /// Record `guardian`'s shard, returning the updated session and whether
    /// this submission made it ready
    pub async fn submit(
        &self,
        id: &RecoveryId,
        guardian: PublicKey,
        shard: SubmittedShard,
    ) -> Result<(RecoverySession, bool)> {
        update(
            &*self.storage,
            &keys::session(id),
            self.policy.max_update_attempts,
            |current: Option<RecoverySession>| {
                let mut session = current.ok_or_else(|| WardenError::session_not_found(id))?;
                let became_ready = session.record_submission(guardian, shard.clone())?;
                Ok(Update::Write {
                    value: session.clone(),
                    expiry: Expiry::Keep,
                    output: (session, became_ready),
                })
            },
        )
        .await
    }

    /// Mark a ready session completed and shorten its lifetime
    ///
    /// The session then lives for the completed lifetime or what remained
    /// of its original lifetime, whichever is shorter. Completing an already
    /// completed session changes nothing, including its remaining lifetime.
    pub async fn complete(&self, id: &RecoveryId, now: u64) -> Result<(RecoverySession, bool)> {
        let policy = self.policy;
        update(
            &*self.storage,
            &keys::session(id),
            self.policy.max_update_attempts,
            |current: Option<RecoverySession>| {
                let mut session = current.ok_or_else(|| WardenError::session_not_found(id))?;
                match session.status {
                    SessionStatus::Pending => Err(WardenError::not_ready(
                        session.submitted_count(),
                        session.threshold,
                    )),
                    SessionStatus::Completed => Ok(Update::Skip((session, false))),
                    SessionStatus::Ready => {
                        let ttl = policy.completed_lifetime(&session, now);
                        session.status = SessionStatus::Completed;
                        session.completed_at = Some(now);
                        Ok(Update::Write {
                            value: session.clone(),
                            expiry: Expiry::After(ttl),
                            output: (session, true),
                        })
                    }
                }
            },
        )
        .await
    }

    async fn discard(&self, id: &RecoveryId) {
        if let Err(e) = self.storage.remove(&keys::session(id)).await {
            tracing::warn!(recovery_id = %id, error = %e, "failed to discard unpublished session");
        }
    }
}

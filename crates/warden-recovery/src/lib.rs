//! # Warden Recovery
//!
//! Server side of guardian-based threshold recovery.
//!
//! An owner configures a guardian set, a threshold and one sealed shard per
//! guardian. A recovering device initiates a session with a one-time
//! encryption key; guardians poll for sessions naming them, re-seal their
//! shard to that key on their own hardware and submit it. Once the
//! threshold is reached the device fetches the shards and reconstructs
//! locally.
//!
//! ## Blind relay
//!
//! This crate only ever stores and forwards [`SealedShard`] ciphertext. It
//! does not link any secret-sharing or decryption code.
//!
//! ## Concurrency
//!
//! Session and index records are updated with optimistic compare-and-swap
//! through [`StorageEffects`](warden_core::effects::StorageEffects).
//! Configuration and disable are single atomic batches guarded by the
//! configuration they were planned against.
//!
//! [`SealedShard`]: warden_core::SealedShard

#![allow(missing_docs)]
#![forbid(unsafe_code)]

pub mod effects;
pub mod guardian_index;
pub mod keys;
pub mod policy;
mod record;
pub mod service;
pub mod session;
pub mod shard_store;
pub mod types;

pub use effects::RecoveryEffects;
pub use policy::RecoveryPolicy;
pub use service::RecoveryService;
pub use session::{Opened, SessionManager};
pub use shard_store::{ConfigSnapshot, ShardStore};
pub use types::{
    CompletionAck, ConfigurationView, ConfigureReceipt, ConfigureRequest, DisableAck,
    FetchedShards, GuardianSet, GuardianUpload, InitiateRequest, InitiateResponse,
    PendingRequest, RecoveryConfig, RecoverySession, RegisterHandleRequest, ReleaseAck,
    ReleaseHandleRequest, SessionProgress, SessionStatus, ShardRecord, SubmissionReceipt,
    SubmitShardRequest, SubmittedShard,
};

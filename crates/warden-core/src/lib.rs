//! # Warden Core - Layer 1: Foundation
//!
//! Shared vocabulary for guardian-based social recovery: the unified error
//! type, identifiers for owners, guardians and sessions, the opaque
//! ciphertext type relayed by the server, and the effect interfaces the
//! recovery service needs from its environment.
//!
//! ## What Belongs Here
//!
//! - `WardenError` and the crate-wide `Result`
//! - Key, handle and session identifiers
//! - `SealedShard`, the blind-relay payload type
//! - Storage, time and handle-resolution effect traits
//!
//! ## What Does NOT Belong Here
//!
//! - Effect handler implementations (belong in warden-effects)
//! - Secret sharing math (belongs in warden-shamir)
//! - Session orchestration (belongs in warden-recovery)

#![forbid(unsafe_code)]

pub mod effects;
pub mod errors;
pub mod identifiers;
pub mod sealed;

pub use errors::{Result, WardenError};
pub use identifiers::{EncryptionKey, Handle, OwnerRef, PublicKey, RecoveryId};
pub use sealed::SealedShard;

//! Storage key layout

use warden_core::{PublicKey, RecoveryId};

const PREFIX: &str = "recovery";

/// Owner's recovery configuration
pub fn config(owner: &PublicKey) -> String {
    format!("{PREFIX}:config:{owner}")
}

/// Prefix shared by every shard key of one owner
pub fn shard_prefix(owner: &PublicKey) -> String {
    format!("{PREFIX}:shard:{owner}:")
}

/// One guardian's sealed shard for one owner
pub fn shard(owner: &PublicKey, guardian: &PublicKey) -> String {
    format!("{}{guardian}", shard_prefix(owner))
}

/// A recovery session
pub fn session(id: &RecoveryId) -> String {
    format!("{PREFIX}:session:{id}")
}

/// Latest session published for an owner
pub fn pending_owner(owner: &PublicKey) -> String {
    format!("{PREFIX}:pending-owner:{owner}")
}

/// Candidate sessions naming a guardian
pub fn guardian_index(guardian: &PublicKey) -> String {
    format!("{PREFIX}:guardian-index:{guardian}")
}

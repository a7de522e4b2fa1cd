//! Owner side: split a secret and seal one share per guardian

use crate::error::{ClientError, Result};
use crate::identity::Identity;
use crate::sealing::seal;
use rand_core::{CryptoRng, RngCore};
use std::collections::HashSet;
use warden_core::{EncryptionKey, PublicKey, SealedShard};
use warden_shamir::SecretDigest;

/// A guardian as known to the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardianContact {
    /// Guardian's Ed25519 key, used by the server to authorize submissions
    pub signing_key: PublicKey,
    /// Guardian's X25519 key, the recipient of their shard
    pub encryption_key: EncryptionKey,
}

/// One sealed share addressed to one guardian
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardianShard {
    /// Recipient guardian
    pub guardian: PublicKey,
    /// Share sealed from the owner's encryption key to the guardian's
    pub encrypted_shard: SealedShard,
}

/// Everything the owner uploads when configuring recovery
#[derive(Debug, Clone)]
pub struct PreparedConfiguration {
    /// Shares required to recover
    pub threshold: usize,
    /// One entry per guardian, in the order given
    pub shards: Vec<GuardianShard>,
    /// Key guardians must use as the sender when opening their shard
    pub owner_encryption_key: EncryptionKey,
    /// Commitment to the secret, kept by the owner for verification
    pub digest: SecretDigest,
}

/// Split `secret` and seal share `i` to guardian `i`
///
/// The sealed plaintext is the serialized share (`index || bytes`), so a
/// guardian's upload carries its own evaluation point.
pub fn prepare_configuration<R>(
    owner: &Identity,
    secret: &[u8],
    guardians: &[GuardianContact],
    threshold: usize,
    rng: &mut R,
) -> Result<PreparedConfiguration>
where
    R: RngCore + CryptoRng,
{
    let mut seen = HashSet::with_capacity(guardians.len());
    for guardian in guardians {
        if guardian.signing_key == owner.public_key() {
            return Err(ClientError::validation("owner cannot be their own guardian"));
        }
        if !seen.insert(guardian.signing_key) {
            return Err(ClientError::validation(format!(
                "duplicate guardian {}",
                guardian.signing_key
            )));
        }
    }

    let split = warden_shamir::split(secret, guardians.len(), threshold, rng)?;
    let shards = guardians
        .iter()
        .zip(&split.shares)
        .map(|(guardian, share)| {
            let encrypted_shard = seal(
                owner.encryption(),
                &guardian.encryption_key,
                &share.to_bytes(),
                &mut *rng,
            )?;
            Ok(GuardianShard {
                guardian: guardian.signing_key,
                encrypted_shard,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PreparedConfiguration {
        threshold,
        shards,
        owner_encryption_key: owner.encryption_key(),
        digest: split.digest,
    })
}

//! Long-term identities
//!
//! An identity is derived entirely from a 32-byte seed: the seed is the
//! Ed25519 signing key and an X25519 encryption secret is hashed from it.
//! Recovering the seed therefore restores both keys, which makes the seed
//! the natural secret to split among guardians.

use crate::sealing::EncryptionKeypair;
use crate::signer::RequestSigner;
use ed25519_dalek::SigningKey;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use warden_core::{EncryptionKey, PublicKey};
use warden_signature::{RequestAuth, SignedAction};
use zeroize::Zeroizing;

const ENCRYPTION_INFO: &[u8] = b"warden/identity/encryption/v1";

/// Signing and encryption keys derived from one seed
pub struct Identity {
    seed: Zeroizing<[u8; 32]>,
    signer: RequestSigner,
    encryption: EncryptionKeypair,
}

impl Identity {
    /// Identity from a fresh random seed
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(seed.as_mut());
        Self::from_seed(&seed)
    }

    /// Deterministic identity from `seed`
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let encryption_secret: Zeroizing<[u8; 32]> = Zeroizing::new(
            Sha256::new()
                .chain_update(ENCRYPTION_INFO)
                .chain_update(seed)
                .finalize()
                .into(),
        );

        Self {
            seed: Zeroizing::new(*seed),
            signer: RequestSigner::new(SigningKey::from_bytes(seed)),
            encryption: EncryptionKeypair::from_secret(encryption_secret),
        }
    }

    /// The seed; this is what owners split among guardians
    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    /// Ed25519 public key
    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    /// X25519 public key
    pub fn encryption_key(&self) -> EncryptionKey {
        self.encryption.public()
    }

    /// Encryption keypair used for sealing and opening shards
    pub fn encryption(&self) -> &EncryptionKeypair {
        &self.encryption
    }

    /// Request signer for this identity
    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    /// Sign `action` at `timestamp`
    pub fn sign(&self, action: &SignedAction, timestamp: u64) -> RequestAuth {
        self.signer.sign(action, timestamp)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("public_key", &self.public_key())
            .field("encryption_key", &self.encryption_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_determines_both_keys() {
        let a = Identity::from_seed(&[1u8; 32]);
        let b = Identity::from_seed(&[1u8; 32]);
        let c = Identity::from_seed(&[2u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.encryption_key(), b.encryption_key());
        assert_ne!(a.public_key(), c.public_key());
        assert_ne!(a.encryption_key(), c.encryption_key());
        assert_ne!(a.public_key().as_bytes(), a.encryption_key().as_bytes());
    }
}

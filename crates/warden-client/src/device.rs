//! Recovering device: one-time key and reconstruction

use crate::error::{ClientError, Result};
use crate::sealing::{open, EncryptionKeypair};
use rand_core::{CryptoRng, RngCore};
use warden_core::{EncryptionKey, SealedShard};
use warden_shamir::{SecretDigest, Share};
use zeroize::Zeroizing;

/// One-time keypair a recovering device publishes as `tempPubkey`
#[derive(Debug)]
pub struct RecoveryKeypair {
    keys: EncryptionKeypair,
}

impl RecoveryKeypair {
    /// Fresh keypair for one recovery attempt
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            keys: EncryptionKeypair::generate(rng),
        }
    }

    /// Public key guardians re-seal to
    pub fn temp_pubkey(&self) -> EncryptionKey {
        self.keys.public()
    }

    /// Open every submitted shard and reconstruct the secret
    ///
    /// `shards` pairs each guardian's encryption key (the sealing sender)
    /// with the shard it submitted. Any shard that fails to open aborts the
    /// attempt. With a `digest`, a reconstruction that does not match it is
    /// refused.
    pub fn reconstruct<'a, I>(
        &self,
        shards: I,
        threshold: usize,
        digest: Option<&SecretDigest>,
    ) -> Result<Zeroizing<Vec<u8>>>
    where
        I: IntoIterator<Item = (&'a EncryptionKey, &'a SealedShard)>,
    {
        let shares = shards
            .into_iter()
            .map(|(sender, sealed)| {
                let plaintext = open(&self.keys, sender, sealed).map_err(|e| {
                    ClientError::opening(format!("shard from {sender}: {e}"))
                })?;
                Ok(Share::from_bytes(&plaintext)?)
            })
            .collect::<Result<Vec<_>>>()?;

        let secret = match digest {
            Some(digest) => warden_shamir::combine_verified(&shares, threshold, digest)?,
            None => warden_shamir::combine(&shares, threshold)?,
        };
        Ok(secret)
    }
}

//! Guardian side: re-seal a stored shard to a recovering device
//!
//! Runs on the guardian's hardware. The shard is opened with the guardian's
//! encryption secret and sealed again to the session's one-time key, so the
//! relay only ever handles ciphertext.

use crate::error::Result;
use crate::identity::Identity;
use crate::sealing::{open, seal};
use rand_core::{CryptoRng, RngCore};
use warden_core::{EncryptionKey, SealedShard};
use warden_shamir::Share;

/// Open `encrypted_shard` (sealed by the owner) and seal it to `temp_pubkey`
///
/// The opened plaintext must parse as a share; anything else is rejected
/// before it is forwarded.
pub fn reseal_for_recovery<R>(
    guardian: &Identity,
    owner_encryption_key: &EncryptionKey,
    temp_pubkey: &EncryptionKey,
    encrypted_shard: &SealedShard,
    rng: &mut R,
) -> Result<SealedShard>
where
    R: RngCore + CryptoRng,
{
    let plaintext = open(guardian.encryption(), owner_encryption_key, encrypted_shard)?;
    let share = Share::from_bytes(&plaintext)?;
    seal(guardian.encryption(), temp_pubkey, &share.to_bytes(), rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::sealing::EncryptionKeypair;
    use assert_matches::assert_matches;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn resealed_shard_opens_for_the_device_only() {
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let owner = Identity::from_seed(&[1u8; 32]);
        let guardian = Identity::from_seed(&[2u8; 32]);
        let device = EncryptionKeypair::generate(&mut rng);

        let share = Share::new(3, vec![9, 8, 7]);
        let stored = seal(
            owner.encryption(),
            &guardian.encryption_key(),
            &share.to_bytes(),
            &mut rng,
        )
        .unwrap();

        let resealed = reseal_for_recovery(
            &guardian,
            &owner.encryption_key(),
            &device.public(),
            &stored,
            &mut rng,
        )
        .unwrap();
        assert_ne!(resealed, stored);

        let plain = open(&device, &guardian.encryption_key(), &resealed).unwrap();
        assert_eq!(Share::from_bytes(&plain).unwrap(), share);
        assert!(open(guardian.encryption(), &owner.encryption_key(), &resealed).is_err());
    }

    #[test]
    fn shard_from_an_impostor_owner_is_refused() {
        let mut rng = ChaCha20Rng::seed_from_u64(22);
        let owner = Identity::from_seed(&[1u8; 32]);
        let impostor = Identity::from_seed(&[7u8; 32]);
        let guardian = Identity::from_seed(&[2u8; 32]);
        let device = EncryptionKeypair::generate(&mut rng);

        let forged = seal(
            impostor.encryption(),
            &guardian.encryption_key(),
            &Share::new(1, vec![1]).to_bytes(),
            &mut rng,
        )
        .unwrap();
        assert_matches!(
            reseal_for_recovery(
                &guardian,
                &owner.encryption_key(),
                &device.public(),
                &forged,
                &mut rng
            ),
            Err(ClientError::Opening { .. })
        );
    }
}

//! Authenticated encryption between X25519 keys
//!
//! `seal` derives a per-pair key from X25519(sender secret, recipient
//! public) through HKDF-SHA256, binding both public keys into the info
//! string, and encrypts with ChaCha20-Poly1305 under a random nonce. The
//! wire form is `nonce || ciphertext`. Opening requires the recipient's
//! secret and the sender's public key, so a shard also authenticates who
//! sealed it.

use crate::error::{ClientError, Result};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use curve25519_dalek::montgomery::MontgomeryPoint;
use hkdf::Hkdf;
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use warden_core::{EncryptionKey, SealedShard};
use zeroize::Zeroizing;

const SEAL_INFO: &[u8] = b"warden/seal/v1";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// An X25519 keypair
pub struct EncryptionKeypair {
    secret: Zeroizing<[u8; 32]>,
    public: EncryptionKey,
}

impl EncryptionKeypair {
    /// Fresh random keypair
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut secret = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(secret.as_mut());
        Self::from_secret(secret)
    }

    /// Keypair from an existing secret scalar (clamped on use)
    pub fn from_secret(secret: Zeroizing<[u8; 32]>) -> Self {
        let public = MontgomeryPoint::mul_base_clamped(*secret);
        Self {
            secret,
            public: EncryptionKey::from_bytes(public.to_bytes()),
        }
    }

    /// Public half
    pub fn public(&self) -> EncryptionKey {
        self.public
    }

    fn shared_secret(&self, peer: &EncryptionKey) -> Result<Zeroizing<[u8; 32]>> {
        let point = MontgomeryPoint(*peer.as_bytes()).mul_clamped(*self.secret);
        let shared = Zeroizing::new(point.to_bytes());
        if bool::from(shared[..].ct_eq(&[0u8; 32][..])) {
            return Err(ClientError::validation("peer key is a low-order point"));
        }
        Ok(shared)
    }
}

impl std::fmt::Debug for EncryptionKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

fn derive_key(
    shared: &[u8; 32],
    sender: &EncryptionKey,
    recipient: &EncryptionKey,
) -> Result<Zeroizing<[u8; 32]>> {
    let mut info = Vec::with_capacity(SEAL_INFO.len() + 64);
    info.extend_from_slice(SEAL_INFO);
    info.extend_from_slice(sender.as_bytes());
    info.extend_from_slice(recipient.as_bytes());

    let mut key = Zeroizing::new([0u8; 32]);
    Hkdf::<Sha256>::new(None, shared)
        .expand(&info, key.as_mut())
        .map_err(|e| ClientError::sealing(format!("key derivation failed: {e}")))?;
    Ok(key)
}

/// Encrypt `plaintext` from `sender` to `recipient`
pub fn seal<R: RngCore + CryptoRng>(
    sender: &EncryptionKeypair,
    recipient: &EncryptionKey,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<SealedShard> {
    let shared = sender.shared_secret(recipient)?;
    let key = derive_key(&shared, &sender.public, recipient)?;

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| ClientError::sealing(format!("encryption failed: {e}")))?;

    let mut wire = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    wire.extend_from_slice(&nonce);
    wire.extend_from_slice(&ciphertext);
    Ok(SealedShard::from_ciphertext(wire))
}

/// Decrypt a shard sealed by `sender` to `recipient`
pub fn open(
    recipient: &EncryptionKeypair,
    sender: &EncryptionKey,
    sealed: &SealedShard,
) -> Result<Zeroizing<Vec<u8>>> {
    let wire = sealed.ciphertext();
    if wire.len() < NONCE_LEN + TAG_LEN {
        return Err(ClientError::opening(format!(
            "sealed shard too short: {} bytes",
            wire.len()
        )));
    }
    let (nonce, ciphertext) = wire.split_at(NONCE_LEN);

    let shared = recipient.shared_secret(sender)?;
    let key = derive_key(&shared, sender, &recipient.public)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| ClientError::opening("authentication failed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn pair(seed: u64) -> EncryptionKeypair {
        EncryptionKeypair::generate(&mut ChaCha20Rng::seed_from_u64(seed))
    }

    #[test]
    fn open_recovers_sealed_plaintext() {
        let (alice, bob) = (pair(1), pair(2));
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let sealed = seal(&alice, &bob.public(), b"share bytes", &mut rng).unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 11 + TAG_LEN);
        let opened = open(&bob, &alice.public(), &sealed).unwrap();
        assert_eq!(&opened[..], b"share bytes");
    }

    #[test]
    fn wrong_recipient_or_sender_cannot_open() {
        let (alice, bob, eve) = (pair(1), pair(2), pair(4));
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let sealed = seal(&alice, &bob.public(), b"share", &mut rng).unwrap();

        assert_matches!(
            open(&eve, &alice.public(), &sealed),
            Err(ClientError::Opening { .. })
        );
        assert_matches!(
            open(&bob, &eve.public(), &sealed),
            Err(ClientError::Opening { .. })
        );
    }

    #[test]
    fn tampering_is_detected() {
        let (alice, bob) = (pair(1), pair(2));
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let sealed = seal(&alice, &bob.public(), b"share", &mut rng).unwrap();

        let mut bytes = sealed.ciphertext().to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        let tampered = SealedShard::from_ciphertext(bytes);
        assert_matches!(
            open(&bob, &alice.public(), &tampered),
            Err(ClientError::Opening { .. })
        );

        let truncated = SealedShard::from_ciphertext(vec![0u8; NONCE_LEN]);
        assert_matches!(
            open(&bob, &alice.public(), &truncated),
            Err(ClientError::Opening { .. })
        );
    }

    #[test]
    fn low_order_peer_key_is_rejected() {
        let alice = pair(1);
        let identity = EncryptionKey::from_bytes([0u8; 32]);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        assert_matches!(
            seal(&alice, &identity, b"share", &mut rng),
            Err(ClientError::Validation { .. })
        );
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", pair(9));
        assert!(rendered.contains("public"));
        assert!(!rendered.contains("secret"));
    }
}

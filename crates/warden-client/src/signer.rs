//! Request signing

use ed25519_dalek::{Signer, SigningKey};
use warden_core::PublicKey;
use warden_signature::{RequestAuth, SignedAction};

/// Signs recovery actions with a long-term Ed25519 key
#[derive(Clone)]
pub struct RequestSigner {
    key: SigningKey,
}

impl RequestSigner {
    /// Wrap a signing key
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Public key requests are attributed to
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.key.verifying_key().to_bytes())
    }

    /// Authentication material for `action` at `timestamp` (ms since epoch)
    pub fn sign(&self, action: &SignedAction, timestamp: u64) -> RequestAuth {
        let message = action.canonical_message(timestamp);
        let signature = self.key.sign(message.as_bytes());
        RequestAuth::new(
            self.public_key(),
            hex::encode(signature.to_bytes()),
            timestamp,
        )
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::effects::PhysicalTime;
    use warden_signature::SignatureGate;

    #[test]
    fn signed_requests_pass_the_gate() {
        let signer = RequestSigner::new(SigningKey::from_bytes(&[5u8; 32]));
        let now = 1_700_000_000_000;
        let action = SignedAction::Configure { threshold: 3 };
        let auth = signer.sign(&action, now);

        let gate = SignatureGate::default();
        let verified = gate
            .authorize(&auth, &action, PhysicalTime::from_millis(now))
            .unwrap();
        assert_eq!(verified, signer.public_key());
    }
}

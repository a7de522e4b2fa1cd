//! Signature gate
//!
//! Verifies that a request claiming to come from a public key was signed by
//! that key's holder within a freshness window. Verification is pure: the
//! caller supplies the current time, and any decoding failure is a
//! rejection rather than a propagated error.

use crate::canonical::SignedAction;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_core::effects::PhysicalTime;
use warden_core::{PublicKey, Result, WardenError};

/// Default freshness window in either direction
pub const DEFAULT_MAX_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Authentication material attached to a request
///
/// Every field is optional on the wire so that absence can be reported as
/// `Unauthorized` instead of a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAuth {
    /// Claimed signer
    #[serde(default)]
    pub pubkey: Option<PublicKey>,
    /// Hex-encoded Ed25519 signature over the canonical message
    #[serde(default)]
    pub signature: Option<String>,
    /// Client timestamp, milliseconds since the epoch
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl RequestAuth {
    /// Fully populated authentication material
    pub fn new(pubkey: PublicKey, signature: impl Into<String>, timestamp: u64) -> Self {
        Self {
            pubkey: Some(pubkey),
            signature: Some(signature.into()),
            timestamp: Some(timestamp),
        }
    }
}

/// Verify `signature` over `message` by `signer`, checking freshness
///
/// Returns `false` if any input is absent, if `timestamp` is more than
/// `max_skew` away from `now` (past or future), or if the signature does
/// not verify.
pub fn verify(
    signature: Option<&str>,
    timestamp: Option<u64>,
    message: Option<&str>,
    signer: Option<&PublicKey>,
    now: PhysicalTime,
    max_skew: Duration,
) -> bool {
    let (Some(signature), Some(timestamp), Some(message), Some(signer)) =
        (signature, timestamp, message, signer)
    else {
        return false;
    };

    if now.abs_diff(PhysicalTime::from_millis(timestamp)) > max_skew {
        return false;
    }

    verify_signature(signature, message.as_bytes(), signer)
}

fn verify_signature(signature_hex: &str, message: &[u8], signer: &PublicKey) -> bool {
    let Ok(bytes) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}

/// Gate applied by every authenticated recovery operation
#[derive(Debug, Clone, Copy)]
pub struct SignatureGate {
    max_skew: Duration,
}

impl Default for SignatureGate {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLOCK_SKEW)
    }
}

impl SignatureGate {
    /// Create a gate with the given freshness window
    pub fn new(max_skew: Duration) -> Self {
        Self { max_skew }
    }

    /// Freshness window
    pub fn max_skew(&self) -> Duration {
        self.max_skew
    }

    /// Authorize `auth` for `action` at `now`, returning the verified signer
    ///
    /// Missing material is `Unauthorized`; a present but stale or invalid
    /// signature is `Forbidden`.
    pub fn authorize(
        &self,
        auth: &RequestAuth,
        action: &SignedAction,
        now: PhysicalTime,
    ) -> Result<PublicKey> {
        let signer = auth
            .pubkey
            .ok_or_else(|| WardenError::unauthorized("missing public key"))?;
        let signature = auth
            .signature
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| WardenError::unauthorized("missing signature"))?;
        let timestamp = auth
            .timestamp
            .ok_or_else(|| WardenError::unauthorized("missing timestamp"))?;

        if now.abs_diff(PhysicalTime::from_millis(timestamp)) > self.max_skew {
            tracing::debug!(action = %action, signer = %signer, "timestamp outside window");
            return Err(WardenError::forbidden("timestamp outside allowed window"));
        }

        let message = action.canonical_message(timestamp);
        if !verify(
            Some(signature),
            Some(timestamp),
            Some(&message),
            Some(&signer),
            now,
            self.max_skew,
        ) {
            tracing::debug!(action = %action, signer = %signer, "signature rejected");
            return Err(WardenError::forbidden("invalid signature"));
        }

        Ok(signer)
    }
}

//! Digest of a shared secret
//!
//! The owner keeps this alongside their local records. A device that
//! reconstructs a secret can compare against it to catch corrupted or
//! forged shares, which plain interpolation cannot detect.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

/// Domain separator mixed into every digest
const DIGEST_DOMAIN: &[u8] = b"warden/secret-digest/v1";

/// SHA-256 commitment to a secret
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecretDigest([u8; 32]);

impl SecretDigest {
    /// Digest of `secret`
    pub fn of(secret: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(DIGEST_DOMAIN);
        hasher.update(secret);
        Self(hasher.finalize().into())
    }

    /// Whether `secret` hashes to this digest, compared in constant time
    pub fn matches(&self, secret: &[u8]) -> bool {
        Self::of(secret).0[..].ct_eq(&self.0[..]).into()
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<String> for SecretDigest {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes = hex::decode(&value).map_err(|e| format!("invalid digest hex: {e}"))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "digest must be 32 bytes".to_string())?;
        Ok(Self(bytes))
    }
}

impl From<SecretDigest> for String {
    fn from(digest: SecretDigest) -> Self {
        digest.to_hex()
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretDigest({})", &self.to_hex()[..16])
    }
}

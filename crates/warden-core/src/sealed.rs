//! Opaque ciphertext carried by the blind relay
//!
//! `SealedShard` is the only type the server uses for shard payloads. It
//! holds bytes it cannot interpret and offers no conversion from any
//! plaintext share type; only client crates can produce or open one.

use crate::errors::WardenError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shard ciphertext, encrypted to a key the server does not hold
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SealedShard(Vec<u8>);

impl SealedShard {
    /// Wrap ciphertext produced by a client
    pub fn from_ciphertext(ciphertext: Vec<u8>) -> Self {
        Self(ciphertext)
    }

    /// Ciphertext bytes, for forwarding to the party that can open them
    pub fn ciphertext(&self) -> &[u8] {
        &self.0
    }

    /// Ciphertext length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the ciphertext is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Base64 encoding used on the wire
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl TryFrom<String> for SealedShard {
    type Error = WardenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        STANDARD
            .decode(value.trim())
            .map(Self)
            .map_err(|e| WardenError::validation(format!("encrypted shard is not base64: {e}")))
    }
}

impl From<SealedShard> for String {
    fn from(shard: SealedShard) -> Self {
        shard.to_base64()
    }
}

impl fmt::Debug for SealedShard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedShard({} bytes)", self.0.len())
    }
}

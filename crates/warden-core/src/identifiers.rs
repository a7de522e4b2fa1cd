//! Identifier types
//!
//! Keys travel as lowercase hex on the wire; recovery ids are random UUIDs.

use crate::errors::WardenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! key_newtype {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name([u8; 32]);

        impl $name {
            /// Wrap raw key bytes
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw key bytes
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lowercase hex encoding
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl FromStr for $name {
            type Err = WardenError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s.trim()).map_err(|e| {
                    WardenError::validation(format!("{} is not valid hex: {e}", $label))
                })?;
                let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
                    WardenError::validation(format!("{} must be 32 bytes", $label))
                })?;
                Ok(Self(bytes))
            }
        }

        impl TryFrom<String> for $name {
            type Error = WardenError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(key: $name) -> Self {
                key.to_hex()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..16])
            }
        }
    };
}

key_newtype!(
    /// Long-term Ed25519 public key; identifies owners and guardians
    PublicKey,
    "public key"
);

key_newtype!(
    /// X25519 public key used as a sealing target
    EncryptionKey,
    "encryption key"
);

/// Random identifier of a recovery session
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecoveryId(Uuid);

impl RecoveryId {
    /// Generate a fresh random identifier
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for RecoveryId {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| WardenError::validation(format!("invalid recovery id: {e}")))
    }
}

impl fmt::Display for RecoveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RecoveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoveryId({})", self.0)
    }
}

/// Minimum handle length
pub const HANDLE_MIN_LEN: usize = 3;
/// Maximum handle length
pub const HANDLE_MAX_LEN: usize = 20;

/// Human-readable handle, normalized to lowercase
///
/// 3-20 characters of ASCII letters, digits and `_`. A leading `@` is
/// accepted and stripped.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Handle(String);

impl Handle {
    /// Validate and normalize a handle
    pub fn parse(raw: &str) -> Result<Self, WardenError> {
        let name = raw.trim();
        let name = name.strip_prefix('@').unwrap_or(name);

        if name.len() < HANDLE_MIN_LEN || name.len() > HANDLE_MAX_LEN {
            return Err(WardenError::validation(format!(
                "handle must be {HANDLE_MIN_LEN}-{HANDLE_MAX_LEN} characters"
            )));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(WardenError::validation(
                "handle can only contain letters, numbers, and underscores",
            ));
        }

        Ok(Self(name.to_ascii_lowercase()))
    }

    /// Normalized handle text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Handle {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Handle {
    type Error = WardenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Handle> for String {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

/// How a recovering device names the identity it wants back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerRef {
    /// Direct public key
    PublicKey(PublicKey),
    /// Handle to resolve through the registry
    Handle(Handle),
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublicKey(key) => write!(f, "{key}"),
            Self::Handle(handle) => write!(f, "{handle}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_hex_roundtrip_through_json() {
        let key = PublicKey::from_bytes([7u8; 32]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(32)));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn public_key_rejects_wrong_length() {
        let err = "abcd".parse::<PublicKey>().unwrap_err();
        assert!(matches!(err, WardenError::Validation { .. }));
        assert!(serde_json::from_str::<EncryptionKey>("\"zz\"").is_err());
    }

    #[test]
    fn handle_is_normalized() {
        let handle = Handle::parse("@Alice_01").unwrap();
        assert_eq!(handle.as_str(), "alice_01");
        assert_eq!(handle.to_string(), "@alice_01");
    }

    #[test]
    fn handle_length_and_charset_rules() {
        assert!(Handle::parse("ab").is_err());
        assert!(Handle::parse("abc").is_ok());
        assert!(Handle::parse(&"a".repeat(20)).is_ok());
        assert!(Handle::parse(&"a".repeat(21)).is_err());
        assert!(Handle::parse("bad-name").is_err());
        assert!(Handle::parse("spaced name").is_err());
    }

    #[test]
    fn recovery_ids_are_unique() {
        let a = RecoveryId::new_random();
        let b = RecoveryId::new_random();
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<RecoveryId>().unwrap(), a);
    }
}

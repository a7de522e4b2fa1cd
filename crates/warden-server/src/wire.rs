//! Request bodies as they arrive over HTTP
//!
//! Signed bodies carry the signer's key under an operation-specific name
//! (`ownerPubkey`, `guardianPubkey`) next to `signature` and `timestamp`.
//! Those three are optional here so the signature gate, not the JSON
//! parser, decides between `Unauthorized` and `Forbidden`.

use serde::{Deserialize, Serialize};
use warden_core::{
    EncryptionKey, Handle, OwnerRef, PublicKey, RecoveryId, Result, SealedShard, WardenError,
};
use warden_recovery::{
    ConfigureRequest, GuardianUpload, InitiateRequest, PendingRequest, RegisterHandleRequest,
    ReleaseHandleRequest, SubmitShardRequest,
};
use warden_signature::RequestAuth;

fn auth(
    pubkey: Option<PublicKey>,
    signature: Option<String>,
    timestamp: Option<u64>,
) -> RequestAuth {
    RequestAuth {
        pubkey,
        signature,
        timestamp,
    }
}

/// `POST /recovery/configure`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureBody {
    #[serde(default)]
    pub owner_pubkey: Option<PublicKey>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
    pub guardians: Vec<GuardianUpload>,
    pub threshold: usize,
    pub owner_recovery_encryption_key: EncryptionKey,
}

impl From<ConfigureBody> for ConfigureRequest {
    fn from(body: ConfigureBody) -> Self {
        Self {
            guardians: body.guardians,
            threshold: body.threshold,
            owner_recovery_encryption_key: body.owner_recovery_encryption_key,
            auth: auth(body.owner_pubkey, body.signature, body.timestamp),
        }
    }
}

/// `POST /recovery/initiate`
///
/// Exactly one of `ownerPubkey` and `ownerHandle` names the owner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateBody {
    #[serde(default)]
    pub owner_pubkey: Option<PublicKey>,
    #[serde(default)]
    pub owner_handle: Option<String>,
    pub temp_pubkey: EncryptionKey,
}

impl TryFrom<InitiateBody> for InitiateRequest {
    type Error = WardenError;

    fn try_from(body: InitiateBody) -> Result<Self> {
        let owner = match (body.owner_pubkey, body.owner_handle) {
            (Some(key), None) => OwnerRef::PublicKey(key),
            (None, Some(handle)) => OwnerRef::Handle(Handle::parse(&handle)?),
            (Some(_), Some(_)) => {
                return Err(WardenError::validation(
                    "give either ownerPubkey or ownerHandle, not both",
                ))
            }
            (None, None) => {
                return Err(WardenError::validation("ownerPubkey or ownerHandle is required"))
            }
        };
        Ok(Self {
            owner,
            temp_pubkey: body.temp_pubkey,
        })
    }
}

/// `POST /recovery/pending`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingBody {
    #[serde(default)]
    pub guardian_pubkey: Option<PublicKey>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl From<PendingBody> for RequestAuth {
    fn from(body: PendingBody) -> Self {
        auth(body.guardian_pubkey, body.signature, body.timestamp)
    }
}

/// Response to `POST /recovery/pending`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingList {
    pub pending: Vec<PendingRequest>,
}

/// `POST /recovery/submit`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub recovery_id: RecoveryId,
    pub encrypted_shard: SealedShard,
    pub guardian_encryption_pubkey: EncryptionKey,
    #[serde(default)]
    pub guardian_pubkey: Option<PublicKey>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl From<SubmitBody> for SubmitShardRequest {
    fn from(body: SubmitBody) -> Self {
        Self {
            recovery_id: body.recovery_id,
            encrypted_shard: body.encrypted_shard,
            guardian_encryption_pubkey: body.guardian_encryption_pubkey,
            auth: auth(body.guardian_pubkey, body.signature, body.timestamp),
        }
    }
}

/// `POST /recovery/disable`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableBody {
    #[serde(default)]
    pub owner_pubkey: Option<PublicKey>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl From<DisableBody> for RequestAuth {
    fn from(body: DisableBody) -> Self {
        auth(body.owner_pubkey, body.signature, body.timestamp)
    }
}

/// `POST /recovery/handles/register`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterHandleBody {
    pub handle: String,
    pub encryption_key: EncryptionKey,
    #[serde(default)]
    pub owner_pubkey: Option<PublicKey>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl TryFrom<RegisterHandleBody> for RegisterHandleRequest {
    type Error = WardenError;

    fn try_from(body: RegisterHandleBody) -> Result<Self> {
        Ok(Self {
            handle: Handle::parse(&body.handle)?,
            encryption_key: body.encryption_key,
            auth: auth(body.owner_pubkey, body.signature, body.timestamp),
        })
    }
}

/// `POST /recovery/handles/release`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseHandleBody {
    pub handle: String,
    #[serde(default)]
    pub owner_pubkey: Option<PublicKey>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl TryFrom<ReleaseHandleBody> for ReleaseHandleRequest {
    type Error = WardenError;

    fn try_from(body: ReleaseHandleBody) -> Result<Self> {
        Ok(Self {
            handle: Handle::parse(&body.handle)?,
            auth: auth(body.owner_pubkey, body.signature, body.timestamp),
        })
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub version: String,
}

impl Health {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const TEMP: &str = "0202020202020202020202020202020202020202020202020202020202020202";
    const OWNER: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn initiate(json: String) -> Result<InitiateRequest> {
        let body: InitiateBody = serde_json::from_str(&json).unwrap();
        InitiateRequest::try_from(body)
    }

    #[test]
    fn initiate_accepts_key_or_handle() {
        let by_key = initiate(format!(r#"{{"ownerPubkey":"{OWNER}","tempPubkey":"{TEMP}"}}"#))
            .unwrap();
        assert_matches!(by_key.owner, OwnerRef::PublicKey(_));

        let by_handle =
            initiate(format!(r#"{{"ownerHandle":"@Alice","tempPubkey":"{TEMP}"}}"#)).unwrap();
        assert_matches!(by_handle.owner, OwnerRef::Handle(h) if h.as_str() == "alice");
    }

    #[test]
    fn initiate_needs_exactly_one_owner_reference() {
        assert_matches!(
            initiate(format!(r#"{{"tempPubkey":"{TEMP}"}}"#)),
            Err(WardenError::Validation { .. })
        );
        assert_matches!(
            initiate(format!(
                r#"{{"ownerPubkey":"{OWNER}","ownerHandle":"alice","tempPubkey":"{TEMP}"}}"#
            )),
            Err(WardenError::Validation { .. })
        );
    }

    #[test]
    fn handle_bodies_normalize_the_handle() {
        let body: RegisterHandleBody = serde_json::from_str(&format!(
            r#"{{"handle":"@Alice","encryptionKey":"{TEMP}","ownerPubkey":"{OWNER}"}}"#
        ))
        .unwrap();
        let request = RegisterHandleRequest::try_from(body).unwrap();
        assert_eq!(request.handle.as_str(), "alice");
        assert!(request.auth.signature.is_none());

        let body: ReleaseHandleBody =
            serde_json::from_str(r#"{"handle":"not a handle!"}"#).unwrap();
        assert_matches!(
            ReleaseHandleRequest::try_from(body),
            Err(WardenError::Validation { .. })
        );
    }

    #[test]
    fn signed_bodies_tolerate_missing_auth_fields() {
        let body: DisableBody = serde_json::from_str("{}").unwrap();
        assert_eq!(RequestAuth::from(body), RequestAuth::default());

        let body: PendingBody =
            serde_json::from_str(&format!(r#"{{"guardianPubkey":"{OWNER}"}}"#)).unwrap();
        let auth = RequestAuth::from(body);
        assert!(auth.pubkey.is_some());
        assert!(auth.signature.is_none());
    }
}

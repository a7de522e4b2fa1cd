//! Canonical messages for signed recovery actions
//!
//! Every authenticated operation signs a string that embeds the action
//! name, its salient identifiers and the request timestamp, so a signature
//! for one action never verifies as another.

use std::fmt;
use warden_core::{EncryptionKey, Handle, RecoveryId};

/// Namespace prefix shared by every recovery action
pub const ACTION_NAMESPACE: &str = "recovery";

/// An action that requires a signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedAction {
    /// Owner stores a guardian set and threshold
    Configure {
        /// Threshold being configured
        threshold: usize,
    },
    /// Guardian lists sessions waiting on them
    Pending,
    /// Guardian submits a re-sealed shard to a session
    Submit {
        /// Target session
        recovery_id: RecoveryId,
    },
    /// Owner removes their configuration and shards
    Disable,
    /// Identity claims a handle, or rotates the encryption key behind it
    RegisterHandle {
        /// Handle being claimed
        handle: Handle,
        /// Encryption key the handle will resolve to
        encryption_key: EncryptionKey,
    },
    /// Identity gives up a handle
    ReleaseHandle {
        /// Handle being released
        handle: Handle,
    },
}

impl SignedAction {
    /// Short action name used in messages and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configure { .. } => "configure",
            Self::Pending => "pending",
            Self::Submit { .. } => "submit",
            Self::Disable => "disable",
            Self::RegisterHandle { .. } => "register-handle",
            Self::ReleaseHandle { .. } => "release-handle",
        }
    }

    /// The exact string a client signs for this action at `timestamp`
    pub fn canonical_message(&self, timestamp: u64) -> String {
        match self {
            Self::Configure { threshold } => {
                format!("{ACTION_NAMESPACE}:configure:{threshold}:{timestamp}")
            }
            Self::Pending => format!("{ACTION_NAMESPACE}:pending:{timestamp}"),
            Self::Submit { recovery_id } => {
                format!("{ACTION_NAMESPACE}:submit:{recovery_id}:{timestamp}")
            }
            Self::Disable => format!("{ACTION_NAMESPACE}:disable:{timestamp}"),
            Self::RegisterHandle {
                handle,
                encryption_key,
            } => format!(
                "{ACTION_NAMESPACE}:register-handle:{handle}:{encryption_key}:{timestamp}"
            ),
            Self::ReleaseHandle { handle } => {
                format!("{ACTION_NAMESPACE}:release-handle:{handle}:{timestamp}")
            }
        }
    }
}

impl fmt::Display for SignedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_formats() {
        assert_eq!(
            SignedAction::Configure { threshold: 2 }.canonical_message(1_700_000_000_000),
            "recovery:configure:2:1700000000000"
        );
        assert_eq!(
            SignedAction::Pending.canonical_message(5),
            "recovery:pending:5"
        );
        let id: RecoveryId = "6f1c1f3e-0a0b-4c5d-8e9f-0123456789ab".parse().unwrap();
        assert_eq!(
            SignedAction::Submit { recovery_id: id }.canonical_message(7),
            "recovery:submit:6f1c1f3e-0a0b-4c5d-8e9f-0123456789ab:7"
        );
        assert_eq!(
            SignedAction::Disable.canonical_message(9),
            "recovery:disable:9"
        );
        let handle = Handle::parse("@Alice").unwrap();
        assert_eq!(
            SignedAction::RegisterHandle {
                handle: handle.clone(),
                encryption_key: EncryptionKey::from_bytes([0xcd; 32]),
            }
            .canonical_message(11),
            format!("recovery:register-handle:alice:{}:11", "cd".repeat(32))
        );
        assert_eq!(
            SignedAction::ReleaseHandle { handle }.canonical_message(12),
            "recovery:release-handle:alice:12"
        );
    }
}

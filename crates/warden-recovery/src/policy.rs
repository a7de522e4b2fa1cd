//! Protocol timing and retry policy

use crate::types::RecoverySession;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_core::{Result, WardenError};
use warden_signature::DEFAULT_MAX_CLOCK_SKEW;

/// Tunable constants of the recovery protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryPolicy {
    /// Lifetime of a pending or ready session
    pub session_ttl: Duration,
    /// Lifetime of a session once the device marks it completed
    pub completed_ttl: Duration,
    /// Accepted distance between a signed timestamp and server time
    pub max_clock_skew: Duration,
    /// Optimistic retries before a contended update gives up
    pub max_update_attempts: u32,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(60 * 60),
            completed_ttl: Duration::from_secs(5 * 60),
            max_clock_skew: DEFAULT_MAX_CLOCK_SKEW,
            max_update_attempts: 16,
        }
    }
}

impl RecoveryPolicy {
    /// Lifetime left to `session` once completed at `now` (ms)
    ///
    /// Completion only ever shortens a session: the result never exceeds
    /// what remains of `session_ttl` since creation.
    pub fn completed_lifetime(&self, session: &RecoverySession, now: u64) -> Duration {
        let deadline = session
            .created_at
            .saturating_add(self.session_ttl.as_millis() as u64);
        let remaining = Duration::from_millis(deadline.saturating_sub(now));
        self.completed_ttl.min(remaining)
    }

    /// Check the policy is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.session_ttl.is_zero() {
            return Err(WardenError::validation("session_ttl must be positive"));
        }
        if self.completed_ttl.is_zero() {
            return Err(WardenError::validation("completed_ttl must be positive"));
        }
        if self.completed_ttl > self.session_ttl {
            return Err(WardenError::validation(
                "completed_ttl must not exceed session_ttl",
            ));
        }
        if self.max_clock_skew.is_zero() {
            return Err(WardenError::validation("max_clock_skew must be positive"));
        }
        if self.max_update_attempts == 0 {
            return Err(WardenError::validation(
                "max_update_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GuardianSet, RecoveryConfig};
    use std::collections::BTreeMap;
    use uuid::Uuid;
    use warden_core::{EncryptionKey, PublicKey};

    fn session_created_at(created_at: u64) -> RecoverySession {
        let config = RecoveryConfig {
            owner_pubkey: PublicKey::from_bytes([0; 32]),
            guardians: GuardianSet::new(vec![
                PublicKey::from_bytes([1; 32]),
                PublicKey::from_bytes([2; 32]),
            ])
            .unwrap(),
            threshold: 2,
            owner_encryption_key: EncryptionKey::from_bytes([3; 32]),
            configured_at: 0,
            generation: Uuid::nil(),
        };
        RecoverySession::new(
            &config,
            BTreeMap::new(),
            EncryptionKey::from_bytes([4; 32]),
            created_at,
        )
    }

    #[test]
    fn defaults_are_valid() {
        let policy = RecoveryPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.session_ttl, Duration::from_secs(3600));
        assert_eq!(policy.completed_ttl, Duration::from_secs(300));
    }

    #[test]
    fn rejects_inconsistent_durations() {
        let mut policy = RecoveryPolicy::default();
        policy.completed_ttl = Duration::from_secs(7200);
        assert!(policy.validate().is_err());

        let mut policy = RecoveryPolicy::default();
        policy.session_ttl = Duration::ZERO;
        assert!(policy.validate().is_err());

        let mut policy = RecoveryPolicy::default();
        policy.max_update_attempts = 0;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn completion_keeps_the_shorter_remaining_lifetime() {
        let policy = RecoveryPolicy::default();
        let session = session_created_at(1_000);

        assert_eq!(policy.completed_lifetime(&session, 1_000), policy.completed_ttl);

        let near_end = 1_000 + 3_600_000 - 120_000;
        assert_eq!(
            policy.completed_lifetime(&session, near_end),
            Duration::from_secs(120)
        );
        assert_eq!(
            policy.completed_lifetime(&session, 1_000 + 3_600_000 + 5),
            Duration::ZERO
        );
    }
}

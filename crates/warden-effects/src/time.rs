//! Wall-clock time handler

use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};
use warden_core::effects::{PhysicalTime, PhysicalTimeEffects, TimeError};

/// Real time handler for production use
///
/// Stateless; delegates to the operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeHandler;

impl RealTimeHandler {
    /// Create a new real time handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for RealTimeHandler {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TimeError::Unavailable {
                reason: format!("system clock before epoch: {e}"),
            })?;
        let ts_ms = u64::try_from(elapsed.as_millis()).map_err(|_| TimeError::Unavailable {
            reason: "system clock out of range".to_string(),
        })?;
        Ok(PhysicalTime::from_millis(ts_ms))
    }
}

#[cfg(test)]
pub(crate) use manual::ManualClock;

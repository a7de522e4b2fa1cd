//! Wall-clock time effect interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Error type for time operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// The clock could not be read
    #[error("Time service unavailable: {reason}")]
    Unavailable {
        /// Why the clock failed
        reason: String,
    },
}

/// Milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhysicalTime {
    /// Unix time in milliseconds
    pub ts_ms: u64,
}

impl PhysicalTime {
    /// Wrap a millisecond timestamp
    pub const fn from_millis(ts_ms: u64) -> Self {
        Self { ts_ms }
    }

    /// This time shifted forward, saturating at `u64::MAX`
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self {
            ts_ms: self.ts_ms.saturating_add(millis),
        }
    }

    /// Absolute distance to another time
    pub fn abs_diff(self, other: Self) -> Duration {
        Duration::from_millis(self.ts_ms.abs_diff(other.ts_ms))
    }
}

/// Wall-clock time effects
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current wall-clock time
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError>;
}

/// Blanket implementation for Arc<T> where T: PhysicalTimeEffects
#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for std::sync::Arc<T> {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        (**self).physical_time().await
    }
}

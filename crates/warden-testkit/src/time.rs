//! Controllable wall clock

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use warden_core::effects::{PhysicalTime, PhysicalTimeEffects, TimeError};

/// 2023-11-14T22:13:20Z, an arbitrary fixed starting point
pub const DEFAULT_START_MS: u64 = 1_700_000_000_000;

/// Clock that only moves when a test moves it
///
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct ControllableTime {
    now_ms: Arc<AtomicU64>,
}

impl Default for ControllableTime {
    fn default() -> Self {
        Self::at(DEFAULT_START_MS)
    }
}

impl ControllableTime {
    /// Clock frozen at `ms`
    pub fn at(ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(ms)),
        }
    }

    /// Current reading in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jump to `ms`
    pub fn set(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl PhysicalTimeEffects for ControllableTime {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        Ok(PhysicalTime::from_millis(self.now_ms()))
    }
}

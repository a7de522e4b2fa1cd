//! In-memory storage handler with per-key expiry
//!
//! Keys are spread over independently locked shards so that operations on
//! distinct keys never serialize behind one map-wide lock. Locks are
//! synchronous and never held across an await point. Expired records are
//! dropped lazily on access and by `purge_expired`.

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use warden_core::effects::{
    BatchOp, Expiry, PhysicalTime, PhysicalTimeEffects, StorageEffects, StorageError,
};

const DEFAULT_SHARDS: usize = 16;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<u64>,
}

impl Entry {
    fn is_live(&self, now: PhysicalTime) -> bool {
        self.expires_at.map_or(true, |deadline| now.ts_ms < deadline)
    }
}

type Shard = HashMap<String, Entry>;

/// In-memory key-value store honouring per-key expiry
#[derive(Clone)]
pub struct MemoryStorageHandler {
    shards: Arc<Vec<Mutex<Shard>>>,
    clock: Arc<dyn PhysicalTimeEffects>,
}

impl MemoryStorageHandler {
    /// Create a store reading expiry against `clock`
    pub fn new(clock: Arc<dyn PhysicalTimeEffects>) -> Self {
        Self::with_shards(clock, DEFAULT_SHARDS)
    }

    /// Create a store with an explicit shard count (at least one)
    pub fn with_shards(clock: Arc<dyn PhysicalTimeEffects>, shards: usize) -> Self {
        let shards: Vec<Mutex<Shard>> = (0..shards.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards: Arc::new(shards),
            clock,
        }
    }

    /// Drop every expired record, returning how many were removed
    pub async fn purge_expired(&self) -> Result<usize, StorageError> {
        let now = self.now().await?;
        let mut purged = 0;
        for shard in self.shards.iter() {
            let mut shard = shard.lock();
            let before = shard.len();
            shard.retain(|_, entry| entry.is_live(now));
            purged += before - shard.len();
        }
        if purged > 0 {
            tracing::debug!(purged, "purged expired records");
        }
        Ok(purged)
    }

    /// Number of live records (for diagnostics and tests)
    pub async fn live_len(&self) -> Result<usize, StorageError> {
        let now = self.now().await?;
        Ok(self
            .shards
            .iter()
            .map(|shard| shard.lock().values().filter(|e| e.is_live(now)).count())
            .sum())
    }

    /// Copy of every live value (for tests asserting what the server holds)
    pub async fn snapshot(&self) -> Result<HashMap<String, Vec<u8>>, StorageError> {
        let now = self.now().await?;
        let mut out = HashMap::new();
        for shard in self.shards.iter() {
            for (key, entry) in shard.lock().iter() {
                if entry.is_live(now) {
                    out.insert(key.clone(), entry.value.clone());
                }
            }
        }
        Ok(out)
    }

    async fn now(&self) -> Result<PhysicalTime, StorageError> {
        self.clock
            .physical_time()
            .await
            .map_err(|e| StorageError::unavailable(format!("clock unavailable: {e}")))
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    fn shard_for(&self, key: &str) -> MutexGuard<'_, Shard> {
        self.shards[self.shard_index(key)].lock()
    }
}

fn live<'a>(shard: &'a mut Shard, key: &str, now: PhysicalTime) -> Option<&'a mut Entry> {
    if shard.get(key).is_some_and(|entry| !entry.is_live(now)) {
        shard.remove(key);
    }
    shard.get_mut(key)
}

fn deadline(expiry: Expiry, previous: Option<&Entry>, now: PhysicalTime) -> Option<u64> {
    match expiry {
        Expiry::Never => None,
        Expiry::After(ttl) => Some(now.saturating_add(ttl).ts_ms),
        Expiry::Keep => previous.and_then(|entry| entry.expires_at),
    }
}

fn put(shard: &mut Shard, key: &str, value: Vec<u8>, expiry: Expiry, now: PhysicalTime) {
    let expires_at = deadline(expiry, live(shard, key, now).map(|e| &*e), now);
    shard.insert(key.to_string(), Entry { value, expires_at });
}

#[async_trait]
impl StorageEffects for MemoryStorageHandler {
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let now = self.now().await?;
        let mut shard = self.shard_for(key);
        Ok(live(&mut shard, key, now).map(|entry| entry.value.clone()))
    }

    async fn store(&self, key: &str, value: Vec<u8>, expiry: Expiry) -> Result<(), StorageError> {
        let now = self.now().await?;
        let mut shard = self.shard_for(key);
        put(&mut shard, key, value, expiry, now);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let now = self.now().await?;
        let mut shard = self.shard_for(key);
        let existed = live(&mut shard, key, now).is_some();
        shard.remove(key);
        Ok(existed)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Vec<u8>,
        expiry: Expiry,
    ) -> Result<bool, StorageError> {
        let now = self.now().await?;
        let mut shard = self.shard_for(key);
        let current = live(&mut shard, key, now).map(|entry| entry.value.as_slice());
        if current != expected {
            return Ok(false);
        }
        put(&mut shard, key, new, expiry, now);
        Ok(true)
    }

    async fn apply_batch(&self, ops: Vec<BatchOp>) -> Result<bool, StorageError> {
        let now = self.now().await?;

        let mut written = BTreeSet::new();
        for op in ops.iter().filter(|op| op.is_write()) {
            if !written.insert(op.key().to_string()) {
                return Err(StorageError::batch_rejected(format!(
                    "key {} is written twice in one batch",
                    op.key()
                )));
            }
        }

        // Lock every touched shard in index order before checking or writing.
        let indices: BTreeSet<usize> = ops.iter().map(|op| self.shard_index(op.key())).collect();
        let mut guards: HashMap<usize, MutexGuard<'_, Shard>> = indices
            .into_iter()
            .map(|index| (index, self.shards[index].lock()))
            .collect();

        for op in &ops {
            let BatchOp::Check { key, expected } = op else {
                continue;
            };
            let Some(shard) = guards.get_mut(&self.shard_index(key)) else {
                return Err(StorageError::batch_rejected("shard lock missing"));
            };
            let current = live(shard, key, now).map(|entry| entry.value.as_slice());
            if current != expected.as_deref() {
                return Ok(false);
            }
        }

        for op in ops {
            let index = self.shard_index(op.key());
            let Some(shard) = guards.get_mut(&index) else {
                return Err(StorageError::batch_rejected("shard lock missing"));
            };
            match op {
                BatchOp::Check { .. } => {}
                BatchOp::Put { key, value, expiry } => put(shard, &key, value, expiry, now),
                BatchOp::Delete { key } => {
                    shard.remove(&key);
                }
            }
        }
        Ok(true)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let now = self.now().await?;
        let mut keys = Vec::new();
        for shard in self.shards.iter() {
            keys.extend(
                shard
                    .lock()
                    .iter()
                    .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
                    .map(|(key, _)| key.clone()),
            );
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use std::time::Duration;

    fn handler() -> (MemoryStorageHandler, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        (MemoryStorageHandler::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn store_and_retrieve() {
        let (storage, _) = handler();
        storage.store("a", b"1".to_vec(), Expiry::Never).await.unwrap();
        assert_eq!(storage.retrieve("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(storage.retrieve("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_records_are_invisible() {
        let (storage, clock) = handler();
        storage
            .store("s", b"x".to_vec(), Expiry::After(Duration::from_secs(60)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(59));
        assert!(storage.retrieve("s").await.unwrap().is_some());
        clock.advance(Duration::from_secs(1));
        assert!(storage.retrieve("s").await.unwrap().is_none());
        assert!(!storage.remove("s").await.unwrap());
        assert!(storage.list_keys("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn compare_and_swap_requires_expected_value() {
        let (storage, _) = handler();
        assert!(storage
            .compare_and_swap("k", None, b"v1".to_vec(), Expiry::Never)
            .await
            .unwrap());
        assert!(!storage
            .compare_and_swap("k", None, b"v2".to_vec(), Expiry::Never)
            .await
            .unwrap());
        assert!(!storage
            .compare_and_swap("k", Some(b"other"), b"v2".to_vec(), Expiry::Never)
            .await
            .unwrap());
        assert!(storage
            .compare_and_swap("k", Some(b"v1"), b"v2".to_vec(), Expiry::Never)
            .await
            .unwrap());
        assert_eq!(storage.retrieve("k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn compare_and_swap_keeps_deadline() {
        let (storage, clock) = handler();
        storage
            .store("k", b"v1".to_vec(), Expiry::After(Duration::from_secs(10)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(8));
        assert!(storage
            .compare_and_swap("k", Some(b"v1"), b"v2".to_vec(), Expiry::Keep)
            .await
            .unwrap());
        clock.advance(Duration::from_secs(2));
        assert_eq!(storage.retrieve("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn batch_applies_puts_and_deletes() {
        let (storage, _) = handler();
        storage.store("old", b"x".to_vec(), Expiry::Never).await.unwrap();
        let applied = storage
            .apply_batch(vec![
                BatchOp::Put {
                    key: "a".into(),
                    value: b"1".to_vec(),
                    expiry: Expiry::Never,
                },
                BatchOp::Put {
                    key: "b".into(),
                    value: b"2".to_vec(),
                    expiry: Expiry::Never,
                },
                BatchOp::Delete { key: "old".into() },
                BatchOp::Delete {
                    key: "missing".into(),
                },
            ])
            .await
            .unwrap();
        assert!(applied);
        assert_eq!(storage.list_keys("").await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn batch_with_duplicate_keys_writes_nothing() {
        let (storage, _) = handler();
        let result = storage
            .apply_batch(vec![
                BatchOp::Put {
                    key: "a".into(),
                    value: b"1".to_vec(),
                    expiry: Expiry::Never,
                },
                BatchOp::Delete { key: "a".into() },
            ])
            .await;
        assert!(matches!(result, Err(StorageError::BatchRejected { .. })));
        assert_eq!(storage.retrieve("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_check_writes_nothing() {
        let (storage, _) = handler();
        storage.store("guard", b"v1".to_vec(), Expiry::Never).await.unwrap();
        let batch = |expected: &[u8]| {
            vec![
                BatchOp::Check {
                    key: "guard".into(),
                    expected: Some(expected.to_vec()),
                },
                BatchOp::Put {
                    key: "guard".into(),
                    value: b"v2".to_vec(),
                    expiry: Expiry::Never,
                },
                BatchOp::Put {
                    key: "other".into(),
                    value: b"x".to_vec(),
                    expiry: Expiry::Never,
                },
            ]
        };

        assert!(!storage.apply_batch(batch(b"stale")).await.unwrap());
        assert_eq!(storage.retrieve("guard").await.unwrap(), Some(b"v1".to_vec()));
        assert_eq!(storage.retrieve("other").await.unwrap(), None);

        assert!(storage.apply_batch(batch(b"v1")).await.unwrap());
        assert_eq!(storage.retrieve("guard").await.unwrap(), Some(b"v2".to_vec()));
        assert_eq!(storage.retrieve("other").await.unwrap(), Some(b"x".to_vec()));
    }

    #[tokio::test]
    async fn absent_check_requires_missing_key() {
        let (storage, _) = handler();
        let claim = || {
            vec![
                BatchOp::Check {
                    key: "k".into(),
                    expected: None,
                },
                BatchOp::Put {
                    key: "k".into(),
                    value: b"1".to_vec(),
                    expiry: Expiry::Never,
                },
            ]
        };
        assert!(storage.apply_batch(claim()).await.unwrap());
        assert!(!storage.apply_batch(claim()).await.unwrap());
    }

    #[tokio::test]
    async fn purge_drops_expired() {
        let (storage, clock) = handler();
        storage
            .store("t", b"x".to_vec(), Expiry::After(Duration::from_secs(1)))
            .await
            .unwrap();
        storage.store("p", b"y".to_vec(), Expiry::Never).await.unwrap();
        clock.advance(Duration::from_secs(2));
        assert_eq!(storage.purge_expired().await.unwrap(), 1);
        assert_eq!(storage.live_len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_keys_filters_by_prefix() {
        let (storage, _) = handler();
        for key in ["recovery:session:1", "recovery:session:2", "recovery:config:a"] {
            storage.store(key, Vec::new(), Expiry::Never).await.unwrap();
        }
        assert_eq!(
            storage.list_keys("recovery:session:").await.unwrap(),
            vec!["recovery:session:1", "recovery:session:2"]
        );
    }
}

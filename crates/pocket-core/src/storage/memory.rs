//! In-memory key-value backend
//!
//! Handles are cheap clones over shared state, so a test can keep one
//! handle while a store owns another and inspect or sabotage the data.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::{StorageError, StorageResult};
use super::kv::{KvStore, WriteBatch, WriteOp};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, String>,
    /// Number of upcoming `apply` calls to reject
    failing_writes: usize,
}

/// Shared in-memory [`KvStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` batches without applying any of their writes
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().failing_writes = count;
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Copy of every stored entry
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().entries.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .lock()
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()> {
        let mut inner = self.lock();

        if inner.failing_writes > 0 {
            inner.failing_writes -= 1;
            let key = batch
                .ops()
                .first()
                .map(|op| op.key().to_string())
                .unwrap_or_default();
            return Err(StorageError::InjectedFailure { key });
        }

        for op in batch {
            match op {
                WriteOp::Put { key, value } => {
                    inner.entries.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    inner.entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

//! Key-value storage capability
//!
//! The store never talks to a database directly; it is handed a [`KvStore`]
//! at construction. Multi-key writes go through [`WriteBatch`] so a backend
//! can apply them all-or-nothing.

use super::error::StorageResult;

/// One mutation inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put { key: String, value: String },
    Delete { key: String },
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

/// An ordered group of writes applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete { key: key.into() });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// A local text key-value store
///
/// Implementations must make [`KvStore::apply`] atomic: after it returns
/// an error, none of the batch's writes are visible.
pub trait KvStore: Send {
    /// Read the value at `key`
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Check whether `key` holds a value
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// All keys starting with `prefix`, in ascending order
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Apply every write in `batch`, or none of them
    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()>;

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.apply(batch)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.apply(batch)
    }

    /// Release the backend
    fn close(self) -> StorageResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder() {
        let mut batch = WriteBatch::new();
        assert!(batch.is_empty());

        batch.put("a", "1").delete("b");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ops()[0].key(), "a");
        assert_eq!(batch.ops()[1], WriteOp::Delete { key: "b".into() });

        let keys: Vec<String> = batch
            .into_iter()
            .map(|op| op.key().to_string())
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}

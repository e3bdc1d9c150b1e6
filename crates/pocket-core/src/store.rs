//! Capsule record store
//!
//! The `Store` owns a [`KvStore`] and is the only writer of the three
//! document families in it:
//! - `pc_capsules_index` - the listing index
//! - `pc_capsule_<id>` - full capsule documents
//! - `pc_progress_<id>` - study progress per capsule
//!
//! ## Consistency
//!
//! Every write that touches a record also rewrites the index, and both go
//! out in one [`WriteBatch`]. If the backend rejects the batch, the record
//! and the index keep their previous values.
//!
//! ## Damaged data
//!
//! Reads never fail on unparseable documents: a bad record reads as absent,
//! a bad index as empty, bad progress as the default. Writes rebuild a bad
//! index from the records instead of trusting it.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open()?;
//! store.init_storage()?;
//!
//! let mut capsule = Capsule::new();
//! capsule.set_title("Intro");
//! store.put(&capsule)?;
//!
//! let listing = store.list_all();
//! ```

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::Config;
use crate::index::CapsuleIndex;
use crate::models::{Capsule, CapsuleMetadata};
use crate::storage::{KvStore, SqliteKv, WriteBatch};

/// Key layout of the persisted documents
pub(crate) mod keys {
    pub const INDEX: &str = "pc_capsules_index";
    pub const CAPSULE_PREFIX: &str = "pc_capsule_";
    pub const PROGRESS_PREFIX: &str = "pc_progress_";

    pub fn capsule(id: &str) -> String {
        format!("{}{}", CAPSULE_PREFIX, id)
    }

    pub fn progress(capsule_id: &str) -> String {
        format!("{}{}", PROGRESS_PREFIX, capsule_id)
    }
}

/// Summary of what is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Whether the index key exists (bootstrap has run or a capsule was saved)
    pub initialized: bool,
    /// Entries in the listing index
    pub index_entries: usize,
    /// Capsule documents present
    pub capsule_records: usize,
    /// Progress documents present
    pub progress_records: usize,
}

impl StoreStats {
    /// Whether the index has exactly one entry per record
    pub fn is_consistent(&self) -> bool {
        self.index_entries == self.capsule_records
    }
}

/// Persistence for capsules, their index, and study progress
pub struct Store<K: KvStore = SqliteKv> {
    kv: K,
}

impl Store<SqliteKv> {
    /// Open the SQLite-backed store described by the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(&config)
    }

    /// Open the SQLite-backed store for a specific configuration
    pub fn open_with_config(config: &Config) -> Result<Self> {
        let path = config.sqlite_path();
        let kv = SqliteKv::open(&path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        Ok(Self::new(kv))
    }
}

impl<K: KvStore> Store<K> {
    /// Wrap an already opened backend
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Release the backend
    pub fn close(self) -> Result<()> {
        self.kv.close().context("Failed to close storage")
    }

    // ==================== Records ====================

    /// Get a capsule by id
    ///
    /// Returns `None` when the capsule does not exist or its stored
    /// document cannot be read.
    pub fn get(&self, id: &str) -> Option<Capsule> {
        let raw = match self.kv.get(&keys::capsule(id)) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read capsule {}: {}", id, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(capsule) => Some(capsule),
            Err(e) => {
                warn!("Ignoring unreadable capsule {}: {}", id, e);
                None
            }
        }
    }

    /// Check whether a capsule record exists
    pub fn contains(&self, id: &str) -> bool {
        self.kv.contains(&keys::capsule(id)).unwrap_or(false)
    }

    /// Insert or replace a capsule and its index entry
    pub fn put(&mut self, capsule: &Capsule) -> Result<()> {
        let record = serde_json::to_string(capsule)
            .with_context(|| format!("Failed to encode capsule {}", capsule.id))?;

        let mut index = self.index_for_write()?;
        index.upsert(capsule);
        let encoded_index = index.encode().context("Failed to encode capsule index")?;

        let mut batch = WriteBatch::new();
        batch
            .put(keys::capsule(&capsule.id), record)
            .put(keys::INDEX, encoded_index);
        self.kv
            .apply(batch)
            .with_context(|| format!("Failed to save capsule {}", capsule.id))?;

        debug!("Saved capsule {} ({} indexed)", capsule.id, index.len());
        Ok(())
    }

    /// Delete a capsule, its index entry, and its progress
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let mut index = self.index_for_write()?;
        index.remove(id);
        let encoded_index = index.encode().context("Failed to encode capsule index")?;

        let mut batch = WriteBatch::new();
        batch
            .delete(keys::capsule(id))
            .delete(keys::progress(id))
            .put(keys::INDEX, encoded_index);
        self.kv
            .apply(batch)
            .with_context(|| format!("Failed to delete capsule {}", id))?;

        debug!("Deleted capsule {}", id);
        Ok(())
    }

    // ==================== Index ====================

    /// All capsule summaries in insertion order
    pub fn list_all(&self) -> Vec<CapsuleMetadata> {
        match self.read_index() {
            IndexRead::Loaded(index) => index.into_entries(),
            IndexRead::Missing | IndexRead::Damaged => Vec::new(),
        }
    }

    /// Recompute the index from every stored capsule
    ///
    /// Unreadable records are left out. Returns the number of entries.
    pub fn rebuild_index(&mut self) -> Result<usize> {
        let index = self.index_from_records()?;
        let encoded = index.encode().context("Failed to encode capsule index")?;
        self.kv
            .set(keys::INDEX, &encoded)
            .context("Failed to save rebuilt index")?;
        Ok(index.len())
    }

    /// Number of capsules listed in the index
    pub fn capsule_count(&self) -> usize {
        self.list_all().len()
    }

    /// Counts of stored documents
    pub fn stats(&self) -> Result<StoreStats> {
        let initialized = self
            .kv
            .contains(keys::INDEX)
            .context("Failed to check index")?;
        let capsule_records = self
            .kv
            .keys_with_prefix(keys::CAPSULE_PREFIX)
            .context("Failed to list capsules")?
            .len();
        let progress_records = self
            .kv
            .keys_with_prefix(keys::PROGRESS_PREFIX)
            .context("Failed to list progress")?
            .len();

        Ok(StoreStats {
            initialized,
            index_entries: self.capsule_count(),
            capsule_records,
            progress_records,
        })
    }

    // ==================== Internal ====================

    pub(crate) fn kv(&self) -> &K {
        &self.kv
    }

    pub(crate) fn kv_mut(&mut self) -> &mut K {
        &mut self.kv
    }

    fn read_index(&self) -> IndexRead {
        let raw = match self.kv.get(keys::INDEX) {
            Ok(Some(raw)) => raw,
            Ok(None) => return IndexRead::Missing,
            Err(e) => {
                warn!("Failed to read capsule index: {}", e);
                return IndexRead::Damaged;
            }
        };

        match CapsuleIndex::decode(&raw) {
            Ok(index) => IndexRead::Loaded(index),
            Err(e) => {
                warn!("Capsule index is unreadable: {}", e);
                IndexRead::Damaged
            }
        }
    }

    /// The index a write should start from
    fn index_for_write(&self) -> Result<CapsuleIndex> {
        match self.read_index() {
            IndexRead::Loaded(index) => Ok(index),
            // A missing index may still have records behind it
            IndexRead::Missing => self.index_from_records(),
            IndexRead::Damaged => {
                warn!("Rebuilding capsule index from stored records");
                self.index_from_records()
            }
        }
    }

    fn index_from_records(&self) -> Result<CapsuleIndex> {
        let ids: Vec<String> = self
            .kv
            .keys_with_prefix(keys::CAPSULE_PREFIX)
            .context("Failed to list capsules")?
            .into_iter()
            .filter_map(|key| key.strip_prefix(keys::CAPSULE_PREFIX).map(str::to_string))
            .collect();

        let capsules: Vec<Capsule> = ids.iter().filter_map(|id| self.get(id)).collect();
        Ok(CapsuleIndex::rebuild(&capsules))
    }
}

enum IndexRead {
    Missing,
    Damaged,
    Loaded(CapsuleIndex),
}

//! SQLite key-value backend
//!
//! Durable [`KvStore`] over a single `kv` table. Every batch runs inside a
//! transaction, so a failed write leaves the previous state untouched.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::kv::{KvStore, WriteBatch, WriteOp};
use super::schema::{init_schema, needs_init};

/// SQLite-backed [`KvStore`]
#[derive(Debug)]
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        debug!("Opened key-value database at {:?}", path);

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // substr avoids LIKE wildcards inside ids
        let mut stmt = self.conn.prepare(
            "SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let keys = stmt
            .query_map(params![prefix], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn apply(&mut self, batch: WriteBatch) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        for op in batch {
            match op {
                WriteOp::Put { key, value } => {
                    tx.execute(
                        "INSERT INTO kv (key, value) VALUES (?1, ?2)
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                        params![key, value],
                    )?;
                }
                WriteOp::Delete { key } => {
                    tx.execute("DELETE FROM kv WHERE key = ?", params![key])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, err)| err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let mut kv = SqliteKv::open_in_memory().unwrap();
        assert!(kv.get("a").unwrap().is_none());

        kv.set("a", "1").unwrap();
        kv.set("a", "2").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("2"));

        kv.remove("a").unwrap();
        assert!(!kv.contains("a").unwrap());
    }

    #[test]
    fn test_keys_with_prefix_ignores_wildcards() {
        let mut kv = SqliteKv::open_in_memory().unwrap();
        kv.set("pc_capsule_1", "").unwrap();
        kv.set("pc_capsule_2", "").unwrap();
        kv.set("pcXcapsule_3", "").unwrap();
        kv.set("pc_capsules_index", "[]").unwrap();

        let keys = kv.keys_with_prefix("pc_capsule_").unwrap();
        assert_eq!(keys, vec!["pc_capsule_1", "pc_capsule_2"]);
    }

    #[test]
    fn test_batch_is_applied_together() {
        let mut kv = SqliteKv::open_in_memory().unwrap();
        kv.set("gone", "x").unwrap();

        let mut batch = WriteBatch::new();
        batch.put("a", "1").put("b", "2").delete("gone");
        kv.apply(batch).unwrap();

        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(kv.get("b").unwrap().as_deref(), Some("2"));
        assert!(kv.get("gone").unwrap().is_none());
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let mut kv = SqliteKv::open_in_memory().unwrap();
        kv.set("a", "old").unwrap();

        // Reject one key of the batch from inside SQLite
        kv.connection()
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON kv WHEN NEW.key = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let mut batch = WriteBatch::new();
        batch.put("a", "new").put("bad", "x");
        assert!(kv.apply(batch).is_err());

        assert_eq!(kv.get("a").unwrap().as_deref(), Some("old"));
        assert!(kv.get("bad").unwrap().is_none());
    }

    #[test]
    fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("pocket.db");

        {
            let mut kv = SqliteKv::open(&path).unwrap();
            kv.set("k", "v").unwrap();
            kv.close().unwrap();
        }

        let kv = SqliteKv::open(&path).unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v"));
    }
}

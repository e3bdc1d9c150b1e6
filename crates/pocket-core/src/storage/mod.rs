//! Storage layer
//!
//! A small key-value capability the store is built on.
//!
//! ## Backends
//!
//! - **SqliteKv**: durable, one row per document, batches run in a transaction
//! - **MemoryKv**: shared in-memory map with write-failure injection, for tests

pub mod error;
pub mod kv;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, WriteBatch, WriteOp};
pub use memory::MemoryKv;
pub use schema::{init_schema, needs_init, TABLE_LAYOUT_VERSION};
pub use sqlite::SqliteKv;

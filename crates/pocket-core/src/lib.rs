//! Pocket Classroom Core Library
//!
//! This crate provides the local persistence layer for Pocket Classroom,
//! an offline study tool built around self-contained learning capsules
//! (notes, flashcards, quiz questions and attachments).
//!
//! # Architecture
//!
//! - **Key-value storage**: every capsule is one JSON document under its own
//!   key, next to a derived index of summaries and per-capsule progress
//! - **SQLite**: the default backend; multi-key writes run in a transaction
//!
//! A capsule record and its index entry are always written together, so a
//! listing never mentions a capsule that cannot be loaded.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = Store::open()?;
//! store.init_storage()?;
//!
//! let mut capsule = Capsule::new();
//! capsule.set_title("Ownership");
//! capsule.add_flashcard("What owns a value?", "Exactly one variable");
//! store.put(&capsule)?;
//!
//! for summary in store.list_all() {
//!     println!("{} ({} cards)", summary.title, summary.flashcard_count);
//! }
//! ```
//!
//! # Modules
//!
//! - `store`: Capsule records and index (main entry point)
//! - `progress`: Per-capsule study progress
//! - `codec`: Portable export/import documents
//! - `bootstrap`: First-run seeding
//! - `attachments`: File ingestion into data URLs
//! - `autosave`: Periodic draft saving
//! - `storage`: Key-value backends
//! - `config`: Application configuration

pub mod attachments;
pub mod autosave;
pub mod bootstrap;
pub mod codec;
pub mod config;
pub mod id;
pub mod index;
pub mod models;
pub mod progress;
pub mod storage;
pub mod store;

pub use attachments::{
    decode_data_url, ingest_batch, IngestFailure, IngestReport, PendingFile, SizeLimitError,
};
pub use autosave::{save_draft, spawn_autosave, AutosaveHandle};
pub use codec::{export_capsule, import_capsule, ImportError, Imported, SchemaViolation};
pub use config::Config;
pub use id::new_id;
pub use index::CapsuleIndex;
pub use models::{
    Attachment, Capsule, CapsuleMetadata, Flashcard, Note, Progress, QuizError, QuizQuestion,
    SCHEMA_VERSION,
};
pub use storage::{KvStore, MemoryKv, SqliteKv, StorageError};
pub use store::{Store, StoreStats};

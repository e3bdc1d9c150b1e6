//! Capsule import and export
//!
//! Exported capsules are pretty-printed JSON documents with the same field
//! names as the stored records. Import is a validating decoder: a document
//! is either admitted as a complete [`Capsule`] or rejected with an
//! [`ImportError`], and rejection never writes anything.

use anyhow::{Context, Result};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Capsule, SCHEMA_VERSION};
use crate::storage::KvStore;
use crate::store::Store;

/// Top-level fields an import must carry
const REQUIRED_FIELDS: [&str; 5] = ["id", "title", "notes", "flashcards", "quiz"];

/// Why an imported document was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// The text is not a JSON object
    #[error("Invalid capsule file: {0}")]
    Format(String),

    /// The document was written for another schema
    #[error("Invalid capsule version: expected '{expected}', found {}", describe_version(.found))]
    VersionMismatch {
        found: Option<String>,
        expected: &'static str,
    },

    /// The document is well-formed JSON but not a valid capsule
    #[error("Invalid capsule format: {0}")]
    Schema(SchemaViolation),
}

/// A capsule admitted by [`Store::import_capsule`]
#[derive(Debug, Clone, PartialEq)]
pub struct Imported {
    pub capsule: Capsule,
    /// A stored capsule with the same id was overwritten
    pub replaced: bool,
}

/// Detail of an [`ImportError::Schema`] failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("question '{question_id}' marks choice {index} correct but has {choices} choice(s)")]
    CorrectIndexOutOfRange {
        question_id: String,
        index: usize,
        choices: usize,
    },

    #[error("{0}")]
    InvalidDocument(String),
}

fn describe_version(found: &Option<String>) -> String {
    match found {
        Some(version) => format!("'{}'", version),
        None => "no version tag".to_string(),
    }
}

/// Serialize a capsule as a portable document
pub fn export_capsule(capsule: &Capsule) -> serde_json::Result<String> {
    serde_json::to_string_pretty(capsule)
}

/// Parse and validate a portable document
///
/// Ids are kept as given and attachment sizes are not re-checked.
pub fn import_capsule(text: &str) -> Result<Capsule, ImportError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ImportError::Format(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ImportError::Format("expected a JSON object".to_string()))?;

    match object.get("version") {
        Some(Value::String(version)) if version == SCHEMA_VERSION => {}
        found => {
            return Err(ImportError::VersionMismatch {
                found: found.map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }),
                expected: SCHEMA_VERSION,
            })
        }
    }

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| is_missing(object.get(*field)))
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::Schema(SchemaViolation::MissingFields(missing)));
    }

    let capsule: Capsule = serde_json::from_value(value)
        .map_err(|e| ImportError::Schema(SchemaViolation::InvalidDocument(e.to_string())))?;

    if let Some(question) = capsule.quiz.iter().find(|q| q.validate().is_err()) {
        return Err(ImportError::Schema(
            SchemaViolation::CorrectIndexOutOfRange {
                question_id: question.id.clone(),
                index: question.correct_index,
                choices: question.choices.len(),
            },
        ));
    }

    Ok(capsule)
}

/// Absent, null, or an empty id all count as missing
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Suggested file name for an exported capsule
pub fn export_file_name(capsule: &Capsule) -> String {
    let stem = capsule
        .title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    if stem.is_empty() {
        format!("{}.json", capsule.id)
    } else {
        format!("{}.json", stem)
    }
}

impl<K: KvStore> Store<K> {
    /// Export a stored capsule, or `None` if there is no such capsule
    pub fn export_capsule(&self, id: &str) -> Result<Option<String>> {
        match self.get(id) {
            Some(capsule) => export_capsule(&capsule)
                .map(Some)
                .with_context(|| format!("Failed to encode capsule {}", id)),
            None => Ok(None),
        }
    }

    /// Import a document and save it
    ///
    /// A capsule with the same id is replaced.
    pub fn import_capsule(&mut self, text: &str) -> Result<Imported> {
        let capsule = import_capsule(text)?;

        let replaced = self.contains(&capsule.id);
        if replaced {
            warn!(
                "Import of capsule {} replaces an existing capsule with the same id",
                capsule.id
            );
        }
        self.put(&capsule)?;
        info!("Imported capsule {} ({})", capsule.id, capsule.title);
        Ok(Imported { capsule, replaced })
    }
}

//! Capsule listing index
//!
//! An ordered list of [`CapsuleMetadata`], one per stored capsule, kept in
//! insertion order. Only the store mutates it, always from a full capsule.

use serde::{Deserialize, Serialize};

use crate::models::{Capsule, CapsuleMetadata};

/// Derived listing of every stored capsule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapsuleIndex {
    entries: Vec<CapsuleMetadata>,
}

impl CapsuleIndex {
    /// Build an index from a set of capsules, oldest first
    pub(crate) fn rebuild<'a>(capsules: impl IntoIterator<Item = &'a Capsule>) -> Self {
        let mut entries: Vec<CapsuleMetadata> =
            capsules.into_iter().map(CapsuleMetadata::from).collect();
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { entries }
    }

    /// Replace the entry for `capsule` in place, or append a new one
    pub(crate) fn upsert(&mut self, capsule: &Capsule) {
        let metadata = CapsuleMetadata::from(capsule);
        match self.entries.iter_mut().find(|e| e.id == capsule.id) {
            Some(existing) => *existing = metadata,
            None => self.entries.push(metadata),
        }
    }

    /// Drop the entry for `id`, returning whether one existed
    pub(crate) fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub(crate) fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub(crate) fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn get(&self, id: &str) -> Option<&CapsuleMetadata> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[CapsuleMetadata] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CapsuleMetadata> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

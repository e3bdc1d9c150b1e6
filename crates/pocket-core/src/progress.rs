//! Study progress persistence
//!
//! Progress lives beside the capsule record under its own key and is only
//! written by study actions. Nothing here touches capsule content.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::models::Progress;
use crate::storage::KvStore;
use crate::store::{keys, Store};

impl<K: KvStore> Store<K> {
    /// Get progress for a capsule
    ///
    /// When nothing usable is stored, returns a fresh default without
    /// saving it.
    pub fn get_progress(&self, capsule_id: &str) -> Progress {
        let raw = match self.kv().get(&keys::progress(capsule_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Progress::new(capsule_id),
            Err(e) => {
                warn!("Failed to read progress for {}: {}", capsule_id, e);
                return Progress::new(capsule_id);
            }
        };

        let mut progress: Progress = serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring unreadable progress for {}: {}", capsule_id, e);
            Progress::new(capsule_id)
        });
        progress.normalize();
        progress
    }

    /// Save progress, replacing whatever is stored for its capsule
    ///
    /// The stored copy is normalized, and its best score is never lower
    /// than the one already stored.
    pub fn save_progress(&mut self, progress: &Progress) -> Result<()> {
        let mut progress = progress.clone();
        progress.normalize();
        let stored_best = self.get_progress(&progress.capsule_id).best_quiz_score;
        progress.best_quiz_score = progress.best_quiz_score.max(stored_best);

        let raw = serde_json::to_string(&progress).context("Failed to encode progress")?;
        self.kv_mut()
            .set(&keys::progress(&progress.capsule_id), &raw)
            .with_context(|| format!("Failed to save progress for {}", progress.capsule_id))?;
        debug!("Saved progress for {}", progress.capsule_id);
        Ok(())
    }

    /// Mark a flashcard as known
    pub fn record_known(&mut self, capsule_id: &str, card_id: &str) -> Result<Progress> {
        self.update_progress(capsule_id, |p| p.mark_known(card_id))
    }

    /// Mark a flashcard as not yet known
    pub fn record_unknown(&mut self, capsule_id: &str, card_id: &str) -> Result<Progress> {
        self.update_progress(capsule_id, |p| p.mark_unknown(card_id))
    }

    /// Record a finished quiz; the best score only ever goes up
    pub fn record_quiz_score(&mut self, capsule_id: &str, score: u32) -> Result<Progress> {
        self.update_progress(capsule_id, |p| p.record_score(score))
    }

    fn update_progress(
        &mut self,
        capsule_id: &str,
        apply: impl FnOnce(&mut Progress),
    ) -> Result<Progress> {
        let mut progress = self.get_progress(capsule_id);
        apply(&mut progress);
        self.save_progress(&progress)?;
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Capsule;
    use crate::storage::MemoryKv;

    fn memory_store() -> (Store<MemoryKv>, MemoryKv) {
        let kv = MemoryKv::new();
        (Store::new(kv.clone()), kv)
    }

    #[test]
    fn test_default_progress_is_not_persisted() {
        let (store, kv) = memory_store();

        let progress = store.get_progress("c1");
        assert_eq!(progress.capsule_id, "c1");
        assert!(progress.known_flashcards.is_empty());
        assert!(progress.unknown_flashcards.is_empty());
        assert_eq!(progress.best_quiz_score, 0);
        assert!(kv.is_empty());
    }

    #[test]
    fn test_save_and_get() {
        let (mut store, _) = memory_store();
        let mut progress = Progress::new("c1");
        progress.mark_known("card");
        store.save_progress(&progress).unwrap();

        assert_eq!(store.get_progress("c1"), progress);
    }

    #[test]
    fn test_save_normalizes_card_sets() {
        let (mut store, _) = memory_store();
        let mut progress = Progress::new("c1");
        progress.known_flashcards = vec!["k".into(), "k".into()];
        progress.unknown_flashcards = vec!["k".into(), "u".into(), "u".into()];
        store.save_progress(&progress).unwrap();

        let stored = store.get_progress("c1");
        assert_eq!(stored.known_flashcards, vec!["k"]);
        assert_eq!(stored.unknown_flashcards, vec!["u"]);
    }

    #[test]
    fn test_save_never_lowers_best_score() {
        let (mut store, _) = memory_store();
        store.record_quiz_score("c1", 5).unwrap();

        let mut progress = Progress::new("c1");
        progress.best_quiz_score = 1;
        store.save_progress(&progress).unwrap();
        assert_eq!(store.get_progress("c1").best_quiz_score, 5);

        progress.best_quiz_score = 7;
        store.save_progress(&progress).unwrap();
        assert_eq!(store.get_progress("c1").best_quiz_score, 7);
    }

    #[test]
    fn test_duplicates_in_stored_record_are_dropped_on_read() {
        let (store, mut kv) = memory_store();
        kv.set(
            &keys::progress("c1"),
            r#"{"capsuleId":"c1","knownFlashcards":["k","k"],"unknownFlashcards":["k"],"bestQuizScore":2,"lastStudied":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let progress = store.get_progress("c1");
        assert_eq!(progress.known_flashcards, vec!["k"]);
        assert!(progress.unknown_flashcards.is_empty());
        assert_eq!(progress.best_quiz_score, 2);
    }

    #[test]
    fn test_known_then_unknown() {
        let (mut store, _) = memory_store();
        store.record_known("c1", "k").unwrap();
        store.record_unknown("c1", "k").unwrap();

        let progress = store.get_progress("c1");
        assert!(progress.unknown_flashcards.contains(&"k".to_string()));
        assert!(!progress.known_flashcards.contains(&"k".to_string()));
    }

    #[test]
    fn test_quiz_score_ratchet() {
        let (mut store, _) = memory_store();
        store.record_quiz_score("c1", 3).unwrap();
        let first = store.get_progress("c1").last_studied;
        std::thread::sleep(std::time::Duration::from_millis(5));

        let progress = store.record_quiz_score("c1", 2).unwrap();
        assert_eq!(progress.best_quiz_score, 3);
        assert!(progress.last_studied > first);
        assert_eq!(store.get_progress("c1").best_quiz_score, 3);
    }

    #[test]
    fn test_corrupt_progress_reads_as_default() {
        let (mut store, mut kv) = memory_store();
        store.record_quiz_score("c1", 4).unwrap();
        kv.set(&keys::progress("c1"), "[1, 2").unwrap();

        assert_eq!(store.get_progress("c1").best_quiz_score, 0);
    }

    #[test]
    fn test_study_never_changes_capsule() {
        let (mut store, _) = memory_store();
        let mut capsule = Capsule::new();
        let card = capsule.add_flashcard("Q", "A");
        store.put(&capsule).unwrap();

        store.record_known(&capsule.id, &card).unwrap();
        store.record_quiz_score(&capsule.id, 1).unwrap();

        assert_eq!(store.get(&capsule.id), Some(capsule));
    }

    #[test]
    fn test_delete_cascades_to_progress() {
        let (mut store, _) = memory_store();
        let capsule = Capsule::new();
        store.put(&capsule).unwrap();
        store.record_quiz_score(&capsule.id, 5).unwrap();
        store.record_known(&capsule.id, "card").unwrap();

        store.delete(&capsule.id).unwrap();

        assert!(store.get(&capsule.id).is_none());
        assert!(store.list_all().iter().all(|m| m.id != capsule.id));
        let progress = store.get_progress(&capsule.id);
        assert_eq!(progress.best_quiz_score, 0);
        assert!(progress.known_flashcards.is_empty());
        assert_eq!(store.stats().unwrap().progress_records, 0);
    }
}

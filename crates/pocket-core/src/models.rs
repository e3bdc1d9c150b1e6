//! Data models for Pocket Classroom
//!
//! Defines the capsule document and its children (notes, flashcards, quiz
//! questions, attachments), the derived listing summary, and per-capsule
//! study progress. Field names serialize in camelCase so stored documents
//! and exported files share one shape.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::new_id;

/// Compatibility tag carried by every capsule document
pub const SCHEMA_VERSION: &str = "pocket-classroom/v1";

/// Title given to freshly created capsules
pub const DEFAULT_TITLE: &str = "Untitled Capsule";

/// Errors raised while authoring capsule content
#[derive(Error, Debug, PartialEq, Eq)]
pub enum QuizError {
    #[error("Correct answer index {index} is out of range for {choices} choice(s)")]
    CorrectIndexOutOfRange { index: usize, choices: usize },

    #[error("Choice {index} does not exist; the question has {choices} choice(s)")]
    NoSuchChoice { index: usize, choices: usize },
}

/// A learning capsule: the top-level unit of authored content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Capsule {
    /// Unique identifier, fixed at creation
    pub id: String,
    /// Schema compatibility tag
    pub version: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    /// Display-ordered tags without duplicates
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notes: Vec<Note>,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizQuestion>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Capsule {
    /// Create an empty capsule with a fresh id and the current schema tag
    pub fn new() -> Self {
        Self::with_id(new_id())
    }

    /// Create an empty capsule with a specific id
    pub fn with_id(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            version: SCHEMA_VERSION.to_string(),
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            author: String::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            notes: Vec::new(),
            flashcards: Vec::new(),
            quiz: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Refresh the last-modified timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
        self.touch();
    }

    /// Add a tag
    ///
    /// Surrounding whitespace is trimmed; empty and already present tags
    /// are ignored.
    pub fn add_tag(&mut self, tag: impl AsRef<str>) {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
            self.touch();
        }
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
            self.touch();
        }
    }

    /// Set all tags (replacing existing), keeping the first of any duplicates
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags.clear();
        for tag in tags {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self.touch();
    }

    /// Append a note and return its id
    pub fn add_note(&mut self, content: impl Into<String>) -> String {
        let note = Note::new(content);
        let id = note.id.clone();
        self.notes.push(note);
        self.touch();
        id
    }

    /// Append a flashcard and return its id
    pub fn add_flashcard(&mut self, front: impl Into<String>, back: impl Into<String>) -> String {
        let card = Flashcard::new(front, back);
        let id = card.id.clone();
        self.flashcards.push(card);
        self.touch();
        id
    }

    /// Append a quiz question and return its id
    pub fn add_question(&mut self, question: QuizQuestion) -> Result<String, QuizError> {
        question.validate()?;
        let id = question.id.clone();
        self.quiz.push(question);
        self.touch();
        Ok(id)
    }

    /// Replace a note's markdown, returning false if there is no such note
    pub fn update_note(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.notes.iter_mut().find(|n| n.id == id) {
            Some(note) => {
                note.content = content.into();
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Replace both sides of a flashcard
    pub fn update_flashcard(
        &mut self,
        id: &str,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> bool {
        match self.flashcards.iter_mut().find(|c| c.id == id) {
            Some(card) => {
                card.front = front.into();
                card.back = back.into();
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Edit a quiz question in place
    ///
    /// The edit runs on a copy and is kept only if the question is still
    /// valid afterwards. Returns `Ok(false)` if there is no such question.
    pub fn update_question(
        &mut self,
        id: &str,
        edit: impl FnOnce(&mut QuizQuestion) -> Result<(), QuizError>,
    ) -> Result<bool, QuizError> {
        let Some(slot) = self.quiz.iter_mut().find(|q| q.id == id) else {
            return Ok(false);
        };
        let mut edited = slot.clone();
        edit(&mut edited)?;
        edited.validate()?;
        *slot = edited;
        self.touch();
        Ok(true)
    }

    pub fn remove_note(&mut self, id: &str) -> bool {
        let removed = remove_by(&mut self.notes, |n| n.id == id);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn remove_flashcard(&mut self, id: &str) -> bool {
        let removed = remove_by(&mut self.flashcards, |c| c.id == id);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn remove_question(&mut self, id: &str) -> bool {
        let removed = remove_by(&mut self.quiz, |q| q.id == id);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn remove_attachment(&mut self, id: &str) -> bool {
        let removed = remove_by(&mut self.attachments, |a| a.id == id);
        if removed {
            self.touch();
        }
        removed
    }

    /// Look up a flashcard by id
    pub fn flashcard(&self, id: &str) -> Option<&Flashcard> {
        self.flashcards.iter().find(|c| c.id == id)
    }
}

impl Default for Capsule {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_by<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|item| !pred(item));
    items.len() != before
}

/// A markdown note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    /// Markdown source, stored verbatim
    pub content: String,
}

impl Note {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            content: content.into(),
        }
    }
}

/// A two-sided flashcard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flashcard {
    pub id: String,
    pub front: String,
    pub back: String,
}

impl Flashcard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            front: front.into(),
            back: back.into(),
        }
    }
}

/// A multiple-choice question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub choices: Vec<String>,
    /// Index into `choices` of the right answer
    pub correct_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    pub fn new(
        question: impl Into<String>,
        choices: Vec<String>,
        correct_index: usize,
    ) -> Result<Self, QuizError> {
        let q = Self {
            id: new_id(),
            question: question.into(),
            choices,
            correct_index,
            explanation: None,
        };
        q.validate()?;
        Ok(q)
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Check that `correct_index` points at one of the choices
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.correct_index < self.choices.len() {
            Ok(())
        } else {
            Err(QuizError::CorrectIndexOutOfRange {
                index: self.correct_index,
                choices: self.choices.len(),
            })
        }
    }

    /// Replace the text of one existing choice
    pub fn set_choice(&mut self, index: usize, text: impl Into<String>) -> Result<(), QuizError> {
        let choices = self.choices.len();
        match self.choices.get_mut(index) {
            Some(choice) => {
                *choice = text.into();
                Ok(())
            }
            None => Err(QuizError::NoSuchChoice { index, choices }),
        }
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_index
    }
}

/// A file embedded in a capsule as a data URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    /// Original file name
    pub name: String,
    /// MIME type
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size of the raw file in bytes
    pub size: u64,
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Listing summary derived from a [`Capsule`]
///
/// Never edited on its own; always rebuilt from the full document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub note_count: usize,
    pub flashcard_count: usize,
    pub quiz_count: usize,
    pub attachment_count: usize,
}

impl From<&Capsule> for CapsuleMetadata {
    fn from(capsule: &Capsule) -> Self {
        Self {
            id: capsule.id.clone(),
            title: capsule.title.clone(),
            description: capsule.description.clone(),
            author: capsule.author.clone(),
            tags: capsule.tags.clone(),
            created_at: capsule.created_at,
            updated_at: capsule.updated_at,
            note_count: capsule.notes.len(),
            flashcard_count: capsule.flashcards.len(),
            quiz_count: capsule.quiz.len(),
            attachment_count: capsule.attachments.len(),
        }
    }
}

impl CapsuleMetadata {
    /// Case-insensitive substring match over title, description and tags
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

/// Study state for one capsule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Capsule this progress belongs to (not enforced)
    pub capsule_id: String,
    pub known_flashcards: Vec<String>,
    pub unknown_flashcards: Vec<String>,
    /// Highest quiz score seen, never decreases
    pub best_quiz_score: u32,
    pub last_studied: DateTime<Utc>,
}

impl Progress {
    /// Fresh progress with nothing studied yet
    pub fn new(capsule_id: impl Into<String>) -> Self {
        Self {
            capsule_id: capsule_id.into(),
            known_flashcards: Vec::new(),
            unknown_flashcards: Vec::new(),
            best_quiz_score: 0,
            last_studied: Utc::now(),
        }
    }

    /// Move a card to the end of the known set
    pub fn mark_known(&mut self, card_id: &str) {
        self.unknown_flashcards.retain(|id| id != card_id);
        self.known_flashcards.retain(|id| id != card_id);
        self.known_flashcards.push(card_id.to_string());
        self.last_studied = Utc::now();
    }

    /// Move a card to the end of the unknown set
    pub fn mark_unknown(&mut self, card_id: &str) {
        self.known_flashcards.retain(|id| id != card_id);
        self.unknown_flashcards.retain(|id| id != card_id);
        self.unknown_flashcards.push(card_id.to_string());
        self.last_studied = Utc::now();
    }

    /// Keep the higher of the current best and `score`
    pub fn record_score(&mut self, score: u32) {
        self.best_quiz_score = self.best_quiz_score.max(score);
        self.last_studied = Utc::now();
    }

    /// Drop repeated card ids, and ids listed in both sets from the
    /// unknown set
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.known_flashcards.retain(|id| seen.insert(id.clone()));
        self.unknown_flashcards.retain(|id| seen.insert(id.clone()));
    }

    pub fn is_known(&self, card_id: &str) -> bool {
        self.known_flashcards.iter().any(|id| id == card_id)
    }

    pub fn is_unknown(&self, card_id: &str) -> bool {
        self.unknown_flashcards.iter().any(|id| id == card_id)
    }

    pub fn known_count(&self) -> usize {
        self.known_flashcards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capsule_new() {
        let capsule = Capsule::new();
        assert!(!capsule.id.is_empty());
        assert_eq!(capsule.version, SCHEMA_VERSION);
        assert_eq!(capsule.title, DEFAULT_TITLE);
        assert_eq!(capsule.created_at, capsule.updated_at);
        assert!(capsule.notes.is_empty());
        assert!(capsule.flashcards.is_empty());
        assert!(capsule.quiz.is_empty());
        assert!(capsule.attachments.is_empty());
    }

    #[test]
    fn test_capsule_ids_differ() {
        assert_ne!(Capsule::new().id, Capsule::new().id);
    }

    #[test]
    fn test_set_title_touches() {
        let mut capsule = Capsule::new();
        let original_updated = capsule.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(10));
        capsule.set_title("Rust Basics");
        assert_eq!(capsule.title, "Rust Basics");
        assert!(capsule.updated_at > original_updated);
    }

    #[test]
    fn test_tags() {
        let mut capsule = Capsule::new();
        capsule.add_tag("rust");
        capsule.add_tag(" programming ");
        capsule.add_tag("rust");
        capsule.add_tag("   ");
        assert_eq!(capsule.tags, vec!["rust", "programming"]);

        capsule.remove_tag("rust");
        assert_eq!(capsule.tags, vec!["programming"]);

        capsule.set_tags(vec!["b".into(), "a".into(), "b".into()]);
        assert_eq!(capsule.tags, vec!["b", "a"]);
    }

    #[test]
    fn test_children() {
        let mut capsule = Capsule::new();
        let note_id = capsule.add_note("# Hi");
        let card_id = capsule.add_flashcard("front", "back");
        let question = QuizQuestion::new("2 + 2?", vec!["3".into(), "4".into()], 1).unwrap();
        let question_id = capsule.add_question(question).unwrap();

        assert_eq!(capsule.notes.len(), 1);
        assert_eq!(capsule.flashcard(&card_id).unwrap().back, "back");
        assert!(capsule.quiz[0].is_correct(1));

        assert!(capsule.remove_note(&note_id));
        assert!(!capsule.remove_note(&note_id));
        assert!(capsule.remove_flashcard(&card_id));
        assert!(capsule.remove_question(&question_id));
        assert!(capsule.notes.is_empty() && capsule.flashcards.is_empty() && capsule.quiz.is_empty());
    }

    #[test]
    fn test_update_children() {
        let mut capsule = Capsule::new();
        let note_id = capsule.add_note("draft");
        let card_id = capsule.add_flashcard("front", "back");

        assert!(capsule.update_note(&note_id, "# Final"));
        assert_eq!(capsule.notes[0].content, "# Final");
        assert!(!capsule.update_note("missing", "x"));

        assert!(capsule.update_flashcard(&card_id, "Q", "A"));
        let card = capsule.flashcard(&card_id).unwrap();
        assert_eq!((card.front.as_str(), card.back.as_str()), ("Q", "A"));
        assert!(!capsule.update_flashcard("missing", "Q", "A"));
    }

    #[test]
    fn test_update_question_keeps_it_valid() {
        let mut capsule = Capsule::new();
        let question = QuizQuestion::new("2 + 2?", vec!["3".into(), "5".into()], 0).unwrap();
        let id = capsule.add_question(question).unwrap();

        let updated = capsule
            .update_question(&id, |q| {
                q.question = "2 + 3?".into();
                q.set_choice(1, "5")?;
                q.correct_index = 1;
                Ok(())
            })
            .unwrap();
        assert!(updated);
        assert_eq!(capsule.quiz[0].question, "2 + 3?");
        assert!(capsule.quiz[0].is_correct(1));

        let before = capsule.quiz[0].clone();
        assert_eq!(
            capsule.update_question(&id, |q| {
                q.correct_index = 4;
                Ok(())
            }),
            Err(QuizError::CorrectIndexOutOfRange { index: 4, choices: 2 })
        );
        assert_eq!(
            capsule.update_question(&id, |q| q.set_choice(2, "7")),
            Err(QuizError::NoSuchChoice { index: 2, choices: 2 })
        );
        assert_eq!(capsule.quiz[0], before);
        assert_eq!(capsule.update_question("missing", |_| Ok(())), Ok(false));
    }

    #[test]
    fn test_remove_tag_and_attachment() {
        let mut capsule = Capsule::new();
        capsule.add_tag("rust");
        capsule.add_tag("async");
        capsule.remove_tag("rust");
        assert_eq!(capsule.tags, vec!["async"]);

        capsule.attachments.push(Attachment {
            id: "att1".into(),
            name: "a.txt".into(),
            mime_type: "text/plain".into(),
            size: 1,
            data_url: "data:text/plain;base64,YQ==".into(),
            uploaded_at: Utc::now(),
        });
        assert!(capsule.remove_attachment("att1"));
        assert!(!capsule.remove_attachment("att1"));
        assert!(capsule.attachments.is_empty());
    }

    #[test]
    fn test_question_index_validation() {
        let err = QuizQuestion::new("?", vec!["only".into()], 1).unwrap_err();
        assert_eq!(
            err,
            QuizError::CorrectIndexOutOfRange {
                index: 1,
                choices: 1
            }
        );
        assert!(QuizQuestion::new("?", Vec::new(), 0).is_err());

        let mut capsule = Capsule::new();
        let mut question = QuizQuestion::new("?", vec!["a".into()], 0).unwrap();
        question.correct_index = 3;
        assert!(capsule.add_question(question).is_err());
        assert!(capsule.quiz.is_empty());
    }

    #[test]
    fn test_metadata_counts() {
        let mut capsule = Capsule::new();
        capsule.set_title("Intro");
        capsule.add_note("# Hi");
        capsule.add_flashcard("a", "b");
        capsule.add_flashcard("c", "d");

        let meta = CapsuleMetadata::from(&capsule);
        assert_eq!(meta.id, capsule.id);
        assert_eq!(meta.title, "Intro");
        assert_eq!(meta.note_count, 1);
        assert_eq!(meta.flashcard_count, 2);
        assert_eq!(meta.quiz_count, 0);
        assert_eq!(meta.attachment_count, 0);
    }

    #[test]
    fn test_metadata_matches() {
        let mut capsule = Capsule::new();
        capsule.set_title("Introduction to JavaScript");
        capsule.set_description("Learn the basics");
        capsule.add_tag("Beginner");
        let meta = CapsuleMetadata::from(&capsule);

        assert!(meta.matches("javascript"));
        assert!(meta.matches("BASICS"));
        assert!(meta.matches("begin"));
        assert!(!meta.matches("python"));
    }

    #[test]
    fn test_progress_moves_between_sets() {
        let mut progress = Progress::new("c1");
        progress.mark_known("k");
        assert!(progress.is_known("k"));

        progress.mark_unknown("k");
        assert!(progress.is_unknown("k"));
        assert!(!progress.is_known("k"));
        assert_eq!(progress.unknown_flashcards, vec!["k"]);

        progress.mark_known("j");
        progress.mark_known("k");
        assert_eq!(progress.known_flashcards, vec!["j", "k"]);
        assert!(progress.unknown_flashcards.is_empty());
    }

    #[test]
    fn test_progress_score_ratchet() {
        let mut progress = Progress::new("c1");
        progress.record_score(3);
        progress.record_score(2);
        assert_eq!(progress.best_quiz_score, 3);
        progress.record_score(5);
        assert_eq!(progress.best_quiz_score, 5);
    }

    #[test]
    fn test_progress_normalize() {
        let mut progress = Progress::new("c1");
        progress.known_flashcards = vec!["a".into(), "b".into(), "a".into()];
        progress.unknown_flashcards = vec!["c".into(), "b".into(), "c".into()];

        progress.normalize();
        assert_eq!(progress.known_flashcards, vec!["a", "b"]);
        assert_eq!(progress.unknown_flashcards, vec!["c"]);
    }

    #[test]
    fn test_attachment_field_names() {
        let attachment = Attachment {
            id: "a1".into(),
            name: "notes.txt".into(),
            mime_type: "text/plain".into(),
            size: 2,
            data_url: "data:text/plain;base64,aGk=".into(),
            uploaded_at: Utc::now(),
        };
        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["type"], "text/plain");
        assert_eq!(json["dataUrl"], "data:text/plain;base64,aGk=");
        assert!(json.get("uploadedAt").is_some());
    }

    #[test]
    fn test_capsule_serialization() {
        let mut capsule = Capsule::new();
        capsule.add_note("body");
        capsule
            .add_question(
                QuizQuestion::new("q", vec!["a".into(), "b".into()], 0)
                    .unwrap()
                    .with_explanation("because"),
            )
            .unwrap();
        let json = serde_json::to_string(&capsule).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"correctIndex\""));
        let deserialized: Capsule = serde_json::from_str(&json).unwrap();
        assert_eq!(capsule, deserialized);
    }
}

//! First-run setup
//!
//! The first time the store is initialized it gets an index holding one
//! example capsule, so a new library is never blank.

use anyhow::{Context, Result};
use tracing::info;

use crate::id::new_id;
use crate::models::{Capsule, Flashcard, Note, QuizQuestion};
use crate::storage::KvStore;
use crate::store::{keys, Store};

impl<K: KvStore> Store<K> {
    /// Prepare storage on first use
    ///
    /// Returns `true` if this call seeded the example capsule, `false` if
    /// storage was already initialized.
    pub fn init_storage(&mut self) -> Result<bool> {
        let initialized = self
            .kv()
            .contains(keys::INDEX)
            .context("Failed to check for capsule index")?;
        if initialized {
            return Ok(false);
        }

        // `put` writes the record and a fresh index in one batch, so a
        // failed seed leaves storage uninitialized
        let sample = sample_capsule();
        self.put(&sample).context("Failed to save example capsule")?;
        info!("Initialized storage with example capsule {}", sample.id);
        Ok(true)
    }
}

/// The hand-authored example capsule
pub fn sample_capsule() -> Capsule {
    let mut capsule = Capsule::with_id(format!("sample-{}", new_id()));
    capsule.title = "Introduction to JavaScript".to_string();
    capsule.description = "Learn the basics of JavaScript programming".to_string();
    capsule.author = "Pocket Classroom".to_string();
    capsule.tags = vec![
        "programming".to_string(),
        "javascript".to_string(),
        "beginner".to_string(),
    ];

    capsule.notes = vec![
        Note::new(
            "# Variables\n\nVariables are containers for storing data values. In JavaScript, \
             you can declare variables using `let`, `const`, or `var`.\n\n**Example:**\n\
             ```javascript\nlet name = \"John\";\nconst age = 30;\n```",
        ),
        Note::new(
            "# Functions\n\nFunctions are reusable blocks of code that perform specific \
             tasks.\n\n**Example:**\n```javascript\nfunction greet(name) {\n  return \
             \"Hello, \" + name;\n}\n```",
        ),
    ];

    capsule.flashcards = vec![
        Flashcard::new(
            "What is a variable?",
            "A variable is a container for storing data values.",
        ),
        Flashcard::new(
            "What are the three ways to declare a variable in JavaScript?",
            "let, const, and var",
        ),
        Flashcard::new(
            "What is a function?",
            "A function is a reusable block of code that performs a specific task.",
        ),
    ];

    capsule.quiz = vec![
        QuizQuestion {
            id: new_id(),
            question: "Which keyword is used to declare a constant in JavaScript?".to_string(),
            choices: vec![
                "var".to_string(),
                "let".to_string(),
                "const".to_string(),
                "constant".to_string(),
            ],
            correct_index: 2,
            explanation: Some(
                "The `const` keyword is used to declare constants that cannot be reassigned."
                    .to_string(),
            ),
        },
        QuizQuestion {
            id: new_id(),
            question: "What does a function return if no return statement is specified?"
                .to_string(),
            choices: vec![
                "null".to_string(),
                "undefined".to_string(),
                "0".to_string(),
                "false".to_string(),
            ],
            correct_index: 1,
            explanation: Some(
                "Functions return `undefined` by default if no return statement is specified."
                    .to_string(),
            ),
        },
    ];

    capsule
}

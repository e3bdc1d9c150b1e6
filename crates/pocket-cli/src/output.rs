//! Output formatting for CLI
//!
//! Every command prints through [`Output`] so the three modes stay aligned:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag), ids only

use serde::Serialize;

use pocket_core::{Capsule, CapsuleMetadata, Progress};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print a full capsule
    pub fn print_capsule(&self, capsule: &Capsule) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", capsule.id);
                println!("Title:       {}", capsule.title);
                if !capsule.description.is_empty() {
                    println!("Description: {}", capsule.description);
                }
                if !capsule.author.is_empty() {
                    println!("Author:      {}", capsule.author);
                }
                if !capsule.tags.is_empty() {
                    println!("Tags:        {}", capsule.tags.join(", "));
                }
                println!("Created:     {}", capsule.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:     {}", capsule.updated_at.format("%Y-%m-%d %H:%M"));

                if !capsule.notes.is_empty() {
                    println!();
                    println!("── Notes ({}) ──", capsule.notes.len());
                    for note in &capsule.notes {
                        println!("[{}] {}", short_id(&note.id), truncate_line(&note.content, 60));
                    }
                }
                if !capsule.flashcards.is_empty() {
                    println!();
                    println!("── Flashcards ({}) ──", capsule.flashcards.len());
                    for card in &capsule.flashcards {
                        println!(
                            "[{}] {} → {}",
                            short_id(&card.id),
                            truncate_line(&card.front, 35),
                            truncate_line(&card.back, 35)
                        );
                    }
                }
                if !capsule.quiz.is_empty() {
                    println!();
                    println!("── Quiz ({}) ──", capsule.quiz.len());
                    for question in &capsule.quiz {
                        println!("[{}] {}", short_id(&question.id), question.question);
                        for (i, choice) in question.choices.iter().enumerate() {
                            let marker = if i == question.correct_index { "*" } else { " " };
                            println!("    {}{}. {}", marker, i, choice);
                        }
                    }
                }
                if !capsule.attachments.is_empty() {
                    println!();
                    println!("── Attachments ({}) ──", capsule.attachments.len());
                    for attachment in &capsule.attachments {
                        println!(
                            "[{}] {} ({}, {})",
                            short_id(&attachment.id),
                            attachment.name,
                            attachment.mime_type,
                            human_size(attachment.size)
                        );
                    }
                }
            }
            OutputFormat::Json => print_json(capsule),
            OutputFormat::Quiet => println!("{}", capsule.id),
        }
    }

    /// Print capsule summaries
    pub fn print_capsules(&self, capsules: &[CapsuleMetadata]) {
        match self.format {
            OutputFormat::Human => {
                if capsules.is_empty() {
                    println!("No capsules found.");
                    return;
                }
                for meta in capsules {
                    println!(
                        "{} | {} | {}n {}c {}q | {}",
                        short_id(&meta.id),
                        truncate(&meta.title, 35),
                        meta.note_count,
                        meta.flashcard_count,
                        meta.quiz_count,
                        meta.updated_at.format("%Y-%m-%d")
                    );
                }
                println!("\n{} capsule(s)", capsules.len());
            }
            OutputFormat::Json => print_json(capsules),
            OutputFormat::Quiet => {
                for meta in capsules {
                    println!("{}", meta.id);
                }
            }
        }
    }

    /// Print study progress alongside the capsule it belongs to
    pub fn print_progress(&self, capsule: &Capsule, progress: &Progress) {
        match self.format {
            OutputFormat::Human => {
                let total = capsule.flashcards.len();
                println!("Progress for: {} - {}", short_id(&capsule.id), capsule.title);
                println!();
                println!("  Known:      {}/{}", progress.known_count(), total);
                println!("  Unknown:    {}", progress.unknown_flashcards.len());
                println!(
                    "  Best quiz:  {}/{}",
                    progress.best_quiz_score,
                    capsule.quiz.len()
                );
                println!(
                    "  Studied:    {}",
                    progress.last_studied.format("%Y-%m-%d %H:%M")
                );
            }
            OutputFormat::Json => print_json(progress),
            OutputFormat::Quiet => println!("{}", progress.best_quiz_score),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning that does not fail the command
    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("⚠ {}", message),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({"status": "warning", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// First 8 characters of an id
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Byte count with a binary unit
pub fn human_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
pub fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

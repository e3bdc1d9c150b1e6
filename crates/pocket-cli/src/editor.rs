//! Interactive editing support
//!
//! Opens $EDITOR for writing note content and asks yes/no questions.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::Command;

/// Lines starting with this marker are stripped from edited notes
const COMMENT_PREFIX: &str = "<!--";

/// Write a note in the user's editor
///
/// `header` is shown as comment lines above the editing area and removed
/// again. Fails if the result is empty.
pub fn compose_note(header: &[String]) -> Result<String> {
    let mut initial = String::new();
    for line in header {
        initial.push_str(&format!("{} {} -->\n", COMMENT_PREFIX, line));
    }
    initial.push('\n');

    let edited = edit_text(&initial).context("Failed to edit note")?;
    let content = strip_comments(&edited);
    if content.is_empty() {
        bail!("Note content cannot be empty");
    }
    Ok(content)
}

fn strip_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with(COMMENT_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Open content in the user's preferred editor
///
/// Uses $EDITOR, $VISUAL, or falls back to common editors.
pub fn edit_text(initial_content: &str) -> Result<String> {
    let editor = find_editor()?;

    // Markdown extension so editors pick the right highlighting
    let temp_path = env::temp_dir().join(format!("pocket_note_{}.md", std::process::id()));

    fs::write(&temp_path, initial_content)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    let status = Command::new(&editor)
        .arg(&temp_path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor));

    let result = match status {
        Ok(status) if status.success() => fs::read_to_string(&temp_path)
            .with_context(|| format!("Failed to read edited file: {:?}", temp_path)),
        Ok(_) => Err(anyhow::anyhow!(
            "Editor '{}' exited with non-zero status. Check that your editor is configured correctly.",
            editor
        )),
        Err(e) => Err(e),
    };

    let _ = fs::remove_file(&temp_path);
    result
}

/// Find the user's preferred editor
fn find_editor() -> Result<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.is_empty() {
                return Ok(editor);
            }
        }
    }

    let common_editors = ["nano", "vim", "vi", "emacs", "notepad"];
    for editor in common_editors {
        if command_exists(editor) {
            return Ok(editor.to_string());
        }
    }

    bail!(
        "No editor found. Set $EDITOR or pass the note with --content.\n\
         Example: export EDITOR=nano"
    )
}

/// Check if a command exists in PATH
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

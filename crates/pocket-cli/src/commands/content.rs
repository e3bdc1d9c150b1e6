//! Capsule content command handlers
//!
//! Notes, flashcards, quiz questions and attachments are all edited by
//! loading the whole capsule, changing it, and saving it back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use pocket_core::{decode_data_url, ingest_batch, Attachment, PendingFile, QuizQuestion, Store};

use super::{load_capsule, resolve_item_id};
use crate::editor::compose_note;
use crate::output::{human_size, short_id, Output};

/// Add a note, opening the editor when no content is given
pub fn add_note(
    store: &mut Store,
    capsule_id: String,
    content: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut capsule = load_capsule(&capsule_id, store)?;

    let content = match content {
        Some(c) if c.trim().is_empty() => bail!("Note content cannot be empty"),
        Some(c) => c,
        None => compose_note(&[
            format!("Adding note to: {}", capsule.title),
            "Markdown is supported. Comment lines are removed.".to_string(),
        ])?,
    };

    let note_id = capsule.add_note(content);
    store.put(&capsule).context("Failed to save note")?;

    output.success(&format!(
        "Added note {} to capsule {}",
        short_id(&note_id),
        short_id(&capsule.id)
    ));
    Ok(())
}

/// Add a flashcard
pub fn add_card(
    store: &mut Store,
    capsule_id: String,
    front: String,
    back: String,
    output: &Output,
) -> Result<()> {
    let mut capsule = load_capsule(&capsule_id, store)?;

    let card_id = capsule.add_flashcard(front, back);
    store.put(&capsule).context("Failed to save flashcard")?;

    output.success(&format!(
        "Added flashcard {} to capsule {}",
        short_id(&card_id),
        short_id(&capsule.id)
    ));
    Ok(())
}

/// Add a multiple-choice question
pub fn add_question(
    store: &mut Store,
    capsule_id: String,
    question: String,
    choices: Vec<String>,
    correct: usize,
    explanation: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut capsule = load_capsule(&capsule_id, store)?;

    if choices.len() < 2 {
        bail!("A question needs at least two choices (use --choice for each)");
    }
    let mut question = QuizQuestion::new(question, choices, correct)
        .context("Invalid --correct index")?;
    if let Some(explanation) = explanation {
        question = question.with_explanation(explanation);
    }

    let question_id = capsule.add_question(question)?;
    store.put(&capsule).context("Failed to save question")?;

    output.success(&format!(
        "Added question {} to capsule {}",
        short_id(&question_id),
        short_id(&capsule.id)
    ));
    Ok(())
}

/// Attach files to a capsule
///
/// Oversized or unreadable files are reported and skipped; the rest are
/// saved together.
pub async fn attach(
    store: &mut Store,
    capsule_id: String,
    files: Vec<PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut capsule = load_capsule(&capsule_id, store)?;

    let pending = files.into_iter().map(PendingFile::from_path).collect();
    let report = ingest_batch(&mut capsule, pending).await;

    for failure in &report.failures {
        output.warning(&failure.to_string());
    }

    if report.added.is_empty() {
        bail!("No files were attached");
    }
    store.put(&capsule).context("Failed to save attachments")?;

    let total: u64 = capsule
        .attachments
        .iter()
        .filter(|a| report.added.contains(&a.id))
        .map(|a| a.size)
        .sum();
    output.success(&format!(
        "Attached {} file(s) ({}) to capsule {}",
        report.added.len(),
        human_size(total),
        short_id(&capsule.id)
    ));
    Ok(())
}

/// Write an attachment's original bytes to a file
///
/// Without `--output` the file lands in the current directory under its
/// original name; a directory target gets the name appended.
pub fn save_attachment(
    store: &Store,
    capsule_id: String,
    attachment: String,
    output_path: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let capsule = load_capsule(&capsule_id, store)?;
    let attachment_id = resolve_item_id(
        "attachment",
        capsule.attachments.iter().map(|a| a.id.as_str()),
        &attachment,
    )?;
    let attachment = capsule
        .attachments
        .iter()
        .find(|a| a.id == attachment_id)
        .ok_or_else(|| anyhow::anyhow!("Attachment not found: {}", attachment_id))?;

    let data = attachment_bytes(attachment)?;
    let path = attachment_target(output_path.as_deref(), attachment);
    fs::write(&path, &data).with_context(|| format!("Failed to write {:?}", path))?;

    output.success(&format!(
        "Saved {} ({}) to {}",
        attachment.name,
        human_size(data.len() as u64),
        path.display()
    ));
    Ok(())
}

fn attachment_bytes(attachment: &Attachment) -> Result<Vec<u8>> {
    match decode_data_url(&attachment.data_url) {
        Some((_, data)) => Ok(data),
        None => bail!("Attachment {} does not hold a base64 data URL", attachment.name),
    }
}

/// Where a saved attachment goes; only the last component of its stored
/// name is used
fn attachment_target(path: Option<&Path>, attachment: &Attachment) -> PathBuf {
    let file_name = Path::new(&attachment.name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&attachment.id));

    match path {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path.to_path_buf(),
        None => file_name,
    }
}

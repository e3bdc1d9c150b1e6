//! Study command handlers

use anyhow::{bail, Context, Result};

use pocket_core::{Capsule, Store};

use super::{load_capsule, resolve_item_id};
use crate::output::{short_id, Output};

/// Mark a flashcard as known
pub fn known(store: &mut Store, capsule_id: String, card: String, output: &Output) -> Result<()> {
    let capsule = load_capsule(&capsule_id, store)?;
    let card_id = resolve_card_id(&capsule, &card)?;

    store
        .record_known(&capsule.id, &card_id)
        .context("Failed to save progress")?;

    output.success(&format!("Marked {} as known", short_id(&card_id)));
    Ok(())
}

/// Mark a flashcard as still to learn
pub fn unknown(store: &mut Store, capsule_id: String, card: String, output: &Output) -> Result<()> {
    let capsule = load_capsule(&capsule_id, store)?;
    let card_id = resolve_card_id(&capsule, &card)?;

    store
        .record_unknown(&capsule.id, &card_id)
        .context("Failed to save progress")?;

    output.success(&format!("Marked {} as unknown", short_id(&card_id)));
    Ok(())
}

/// Record a finished quiz
pub fn score(store: &mut Store, capsule_id: String, score: u32, output: &Output) -> Result<()> {
    let capsule = load_capsule(&capsule_id, store)?;
    if score as usize > capsule.quiz.len() {
        bail!(
            "Score {} is higher than the number of questions ({})",
            score,
            capsule.quiz.len()
        );
    }

    let progress = store
        .record_quiz_score(&capsule.id, score)
        .context("Failed to save progress")?;

    output.success(&format!(
        "Recorded score {}/{} (best {})",
        score,
        capsule.quiz.len(),
        progress.best_quiz_score
    ));
    Ok(())
}

/// Show progress for a capsule
pub fn show(store: &Store, capsule_id: String, output: &Output) -> Result<()> {
    let capsule = load_capsule(&capsule_id, store)?;
    let progress = store.get_progress(&capsule.id);
    output.print_progress(&capsule, &progress);
    Ok(())
}

/// Resolve a flashcard id given in full or as a unique prefix
fn resolve_card_id(capsule: &Capsule, card: &str) -> Result<String> {
    resolve_item_id(
        "flashcard",
        capsule.flashcards.iter().map(|c| c.id.as_str()),
        card,
    )
}

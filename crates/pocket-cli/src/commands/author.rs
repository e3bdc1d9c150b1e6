//! Interactive authoring session
//!
//! Reads editing commands from stdin, one per line, while the draft is
//! autosaved in the background. The session ends on `done` or end of input
//! with a final save.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use pocket_core::{save_draft, spawn_autosave, Capsule, QuizQuestion, Store};

use super::{load_capsule, resolve_item_id};
use crate::output::{human_size, short_id, truncate, truncate_line, Output};

const HELP: &str = "\
Commands:
  title TEXT                     Set the title
  description TEXT               Set the description
  tag TAG                        Add a tag
  untag TAG                      Remove a tag
  note TEXT                      Add a note
  edit-note ID TEXT              Replace a note
  card FRONT | BACK              Add a flashcard
  edit-card ID FRONT | BACK      Replace both sides of a flashcard
  quiz QUESTION | A | B.. | N    Add a question, N is the correct choice (0-based)
  edit-quiz ID QUESTION          Change a question's text
  choice ID N TEXT               Change choice N of a question
  answer ID N                    Make choice N the correct one
  rm-note ID                     Delete a note
  rm-card ID                     Delete a flashcard
  rm-quiz ID                     Delete a question
  rm-attachment ID               Delete an attachment
  items                          List notes, cards, questions and attachments
  save                           Save now
  done                           Save and exit

IDs may be shortened to any unique prefix.";

/// One line of input
#[derive(Debug, PartialEq)]
enum Action {
    Title(String),
    Description(String),
    Tag(String),
    Untag(String),
    Note(String),
    EditNote { id: String, content: String },
    Card { front: String, back: String },
    EditCard { id: String, front: String, back: String },
    Question { question: String, choices: Vec<String>, correct: usize },
    EditQuestion { id: String, question: String },
    Choice { id: String, index: usize, text: String },
    Answer { id: String, index: usize },
    RemoveNote(String),
    RemoveCard(String),
    RemoveQuestion(String),
    RemoveAttachment(String),
    Items,
    Save,
    Done,
    Help,
}

/// Split off the first word of `text`
fn first_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn split_card(text: &str) -> Result<(String, String)> {
    let (front, back) = text
        .split_once('|')
        .ok_or_else(|| anyhow::anyhow!("Use: card FRONT | BACK"))?;
    Ok((front.trim().to_string(), back.trim().to_string()))
}

fn parse_index(text: &str) -> Result<usize> {
    text.parse()
        .with_context(|| format!("'{}' is not a choice number", text))
}

/// An item id followed by more text
fn split_id<'a>(word: &str, rest: &'a str, what: &str) -> Result<(String, &'a str)> {
    let (id, more) = first_word(rest);
    if id.is_empty() || more.is_empty() {
        bail!("'{}' needs an ID and {}", word, what);
    }
    Ok((id.to_string(), more))
}

fn parse_action(line: &str) -> Result<Action> {
    let (word, rest) = first_word(line.trim());

    let require = |what: &str| -> Result<String> {
        if rest.is_empty() {
            bail!("'{}' needs {}", word, what);
        }
        Ok(rest.to_string())
    };

    let action = match word {
        "title" => Action::Title(require("a title")?),
        "description" => Action::Description(require("a description")?),
        "tag" => Action::Tag(require("a tag")?),
        "untag" => Action::Untag(require("a tag")?),
        "note" => Action::Note(require("some text")?),
        "edit-note" => {
            let (id, content) = split_id(word, rest, "some text")?;
            Action::EditNote {
                id,
                content: content.to_string(),
            }
        }
        "card" => {
            let (front, back) = split_card(rest)?;
            Action::Card { front, back }
        }
        "edit-card" => {
            let (id, sides) = split_id(word, rest, "FRONT | BACK")?;
            let (front, back) = split_card(sides)?;
            Action::EditCard { id, front, back }
        }
        "quiz" => {
            let parts: Vec<String> = rest.split('|').map(|p| p.trim().to_string()).collect();
            if parts.len() < 4 {
                bail!("Use: quiz QUESTION | CHOICE | CHOICE.. | CORRECT");
            }
            let correct = parts[parts.len() - 1]
                .parse()
                .context("The last part of a quiz line must be the correct choice number")?;
            Action::Question {
                question: parts[0].clone(),
                choices: parts[1..parts.len() - 1].to_vec(),
                correct,
            }
        }
        "edit-quiz" => {
            let (id, question) = split_id(word, rest, "the question text")?;
            Action::EditQuestion {
                id,
                question: question.to_string(),
            }
        }
        "choice" => {
            let (id, more) = split_id(word, rest, "a choice number and text")?;
            let (index, text) = first_word(more);
            if text.is_empty() {
                bail!("Use: choice ID N TEXT");
            }
            Action::Choice {
                id,
                index: parse_index(index)?,
                text: text.to_string(),
            }
        }
        "answer" => {
            let (id, index) = split_id(word, rest, "a choice number")?;
            Action::Answer {
                id,
                index: parse_index(index)?,
            }
        }
        "rm-note" => Action::RemoveNote(require("a note ID")?),
        "rm-card" => Action::RemoveCard(require("a flashcard ID")?),
        "rm-quiz" => Action::RemoveQuestion(require("a question ID")?),
        "rm-attachment" => Action::RemoveAttachment(require("an attachment ID")?),
        "items" | "ls" => Action::Items,
        "save" => Action::Save,
        "done" | "exit" | "quit" => Action::Done,
        "help" | "?" => Action::Help,
        other => bail!("Unknown command '{}'. Type 'help' for a list.", other),
    };
    Ok(action)
}

fn note_id(draft: &Capsule, id: &str) -> Result<String> {
    resolve_item_id("note", draft.notes.iter().map(|n| n.id.as_str()), id)
}

fn card_id(draft: &Capsule, id: &str) -> Result<String> {
    resolve_item_id("flashcard", draft.flashcards.iter().map(|c| c.id.as_str()), id)
}

fn question_id(draft: &Capsule, id: &str) -> Result<String> {
    resolve_item_id("question", draft.quiz.iter().map(|q| q.id.as_str()), id)
}

fn attachment_id(draft: &Capsule, id: &str) -> Result<String> {
    resolve_item_id("attachment", draft.attachments.iter().map(|a| a.id.as_str()), id)
}

/// One line per child item, with its short id
fn describe_items(draft: &Capsule) -> String {
    let mut lines = Vec::new();
    for note in &draft.notes {
        lines.push(format!("note       {}  {}", short_id(&note.id), truncate_line(&note.content, 50)));
    }
    for card in &draft.flashcards {
        lines.push(format!("card       {}  {}", short_id(&card.id), truncate(&card.front, 50)));
    }
    for question in &draft.quiz {
        lines.push(format!(
            "quiz       {}  {}",
            short_id(&question.id),
            truncate(&question.question, 50)
        ));
        for (i, choice) in question.choices.iter().enumerate() {
            let mark = if question.is_correct(i) { "*" } else { " " };
            lines.push(format!("             {}{} {}", mark, i, choice));
        }
    }
    for attachment in &draft.attachments {
        lines.push(format!(
            "attachment {}  {} ({})",
            short_id(&attachment.id),
            attachment.name,
            human_size(attachment.size)
        ));
    }
    if lines.is_empty() {
        "No items yet".to_string()
    } else {
        lines.join("\n")
    }
}

/// Apply an editing action to the draft, returning a short description
fn apply(draft: &mut Capsule, action: Action) -> Result<String> {
    let done = match action {
        Action::Title(title) => {
            draft.set_title(title);
            "Title updated".to_string()
        }
        Action::Description(description) => {
            draft.set_description(description);
            "Description updated".to_string()
        }
        Action::Tag(tag) => {
            draft.add_tag(&tag);
            format!("Tagged {}", tag.trim())
        }
        Action::Untag(tag) => {
            if !draft.tags.contains(&tag) {
                bail!("No tag '{}'", tag);
            }
            draft.remove_tag(&tag);
            format!("Removed tag {}", tag)
        }
        Action::Note(content) => format!("Added note {}", short_id(&draft.add_note(content))),
        Action::EditNote { id, content } => {
            let id = note_id(draft, &id)?;
            draft.update_note(&id, content);
            format!("Updated note {}", short_id(&id))
        }
        Action::Card { front, back } => {
            format!("Added flashcard {}", short_id(&draft.add_flashcard(front, back)))
        }
        Action::EditCard { id, front, back } => {
            let id = card_id(draft, &id)?;
            draft.update_flashcard(&id, front, back);
            format!("Updated flashcard {}", short_id(&id))
        }
        Action::Question {
            question,
            choices,
            correct,
        } => {
            let question = QuizQuestion::new(question, choices, correct)?;
            format!("Added question {}", short_id(&draft.add_question(question)?))
        }
        Action::EditQuestion { id, question } => {
            let id = question_id(draft, &id)?;
            draft.update_question(&id, |q| {
                q.question = question;
                Ok(())
            })?;
            format!("Updated question {}", short_id(&id))
        }
        Action::Choice { id, index, text } => {
            let id = question_id(draft, &id)?;
            draft.update_question(&id, |q| q.set_choice(index, text))?;
            format!("Updated choice {} of question {}", index, short_id(&id))
        }
        Action::Answer { id, index } => {
            let id = question_id(draft, &id)?;
            draft.update_question(&id, |q| {
                q.correct_index = index;
                Ok(())
            })?;
            format!("Choice {} is now correct for question {}", index, short_id(&id))
        }
        Action::RemoveNote(id) => {
            let id = note_id(draft, &id)?;
            draft.remove_note(&id);
            format!("Deleted note {}", short_id(&id))
        }
        Action::RemoveCard(id) => {
            let id = card_id(draft, &id)?;
            draft.remove_flashcard(&id);
            format!("Deleted flashcard {}", short_id(&id))
        }
        Action::RemoveQuestion(id) => {
            let id = question_id(draft, &id)?;
            draft.remove_question(&id);
            format!("Deleted question {}", short_id(&id))
        }
        Action::RemoveAttachment(id) => {
            let id = attachment_id(draft, &id)?;
            draft.remove_attachment(&id);
            format!("Deleted attachment {}", short_id(&id))
        }
        Action::Items => describe_items(draft),
        Action::Save | Action::Done | Action::Help => String::new(),
    };
    Ok(done)
}

/// Run an authoring session on an existing capsule
pub async fn run(store: Store, capsule_id: String, interval: Duration, output: &Output) -> Result<()> {
    let capsule = load_capsule(&capsule_id, &store)?;
    output.message(&format!(
        "Editing {} - {} (autosave every {}s, 'help' for commands)",
        short_id(&capsule.id),
        capsule.title,
        interval.as_secs()
    ));

    let store = Arc::new(Mutex::new(store));
    let draft = Arc::new(Mutex::new(capsule));
    let autosave = spawn_autosave(Arc::clone(&store), Arc::clone(&draft), interval);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        if line.trim().is_empty() {
            continue;
        }

        let action = match parse_action(&line) {
            Ok(action) => action,
            Err(e) => {
                output.warning(&e.to_string());
                continue;
            }
        };

        match action {
            Action::Done => break,
            Action::Help => output.message(HELP),
            Action::Save => {
                save_draft(&store, &draft).await?;
                output.success("Saved");
            }
            Action::Items => output.message(&describe_items(&*draft.lock().await)),
            action => {
                let result = apply(&mut *draft.lock().await, action);
                match result {
                    Ok(message) => output.success(&message),
                    Err(e) => output.warning(&e.to_string()),
                }
            }
        }
    }

    let autosaves = autosave.saves();
    autosave.stop().await;
    save_draft(&store, &draft).await.context("Failed to save capsule")?;

    output.success(&format!("Saved capsule ({} autosave(s) during session)", autosaves));
    Ok(())
}

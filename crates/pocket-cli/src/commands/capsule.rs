//! Capsule command handlers

use anyhow::{Context, Result};

use pocket_core::{Capsule, Store};

use super::load_capsule;
use crate::editor::confirm;
use crate::output::{short_id, Output};

/// Prepare storage, seeding the example capsule on first run
pub fn init(store: &mut Store, output: &Output) -> Result<()> {
    let seeded = store.init_storage().context("Failed to initialize storage")?;

    if output.is_json() {
        println!(
            "{}",
            serde_json::json!({
                "seeded": seeded,
                "capsules": store.capsule_count()
            })
        );
    } else if seeded {
        output.success("Initialized storage with an example capsule");
    } else {
        output.message("Storage already initialized.");
    }
    Ok(())
}

/// List capsules, optionally filtered by a search query
pub fn list(store: &Store, search: Option<String>, output: &Output) -> Result<()> {
    let mut capsules = store.list_all();
    if let Some(ref query) = search {
        capsules.retain(|meta| meta.matches(query));
    }

    output.print_capsules(&capsules);
    Ok(())
}

/// Show a single capsule
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let capsule = load_capsule(&id, store)?;
    output.print_capsule(&capsule);
    Ok(())
}

/// Create a new capsule
pub fn create(
    store: &mut Store,
    title: String,
    description: Option<String>,
    author: Option<String>,
    tags: Vec<String>,
    output: &Output,
) -> Result<()> {
    let mut capsule = Capsule::new();
    capsule.set_title(title);
    if let Some(description) = description {
        capsule.set_description(description);
    }
    if let Some(author) = author {
        capsule.set_author(author);
    }
    for tag in tags {
        capsule.add_tag(tag);
    }

    store.put(&capsule).context("Failed to create capsule")?;

    output.success(&format!("Created capsule: {}", capsule.id));
    output.print_capsule(&capsule);
    Ok(())
}

/// Delete a capsule and its progress
pub fn delete(store: &mut Store, id: String, yes: bool, output: &Output) -> Result<()> {
    let capsule = load_capsule(&id, store)?;

    if !yes && output.should_prompt() {
        println!("Delete capsule: {} - {}", short_id(&capsule.id), capsule.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete(&capsule.id)
        .context("Failed to delete capsule")?;

    output.success(&format!("Deleted capsule: {}", capsule.id));
    Ok(())
}

//! Export and import command handlers

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pocket_core::codec::{export_capsule, export_file_name};
use pocket_core::{Capsule, Store};

use super::load_capsule;
use crate::output::Output;

/// Export a capsule to a file, or to stdout without `--output`
pub fn export(store: &Store, id: String, output_path: Option<PathBuf>, output: &Output) -> Result<()> {
    let capsule = load_capsule(&id, store)?;
    let document = export_capsule(&capsule).context("Failed to encode capsule")?;

    match output_path {
        Some(path) => {
            let path = export_target(&path, &capsule);
            fs::write(&path, &document)
                .with_context(|| format!("Failed to write export file: {:?}", path))?;
            output.success(&format!("Exported {} to {}", capsule.title, path.display()));
        }
        None => println!("{}", document),
    }
    Ok(())
}

/// Import a capsule from an exported file
pub fn import(store: &mut Store, file: PathBuf, output: &Output) -> Result<()> {
    let text = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read import file: {:?}", file))?;

    let imported = store.import_capsule(&text)?;
    let capsule = imported.capsule;

    if imported.replaced {
        output.warning(&format!(
            "Replaced existing capsule with the same id: {}",
            capsule.id
        ));
    }
    output.success(&format!("Imported capsule: {} ({})", capsule.title, capsule.id));
    output.print_capsule(&capsule);
    Ok(())
}

/// A directory target gets the suggested file name appended
fn export_target(path: &Path, capsule: &Capsule) -> PathBuf {
    if path.is_dir() {
        path.join(export_file_name(capsule))
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_target() {
        let temp_dir = TempDir::new().unwrap();
        let mut capsule = Capsule::new();
        capsule.set_title("Cell Biology");

        assert_eq!(
            export_target(temp_dir.path(), &capsule),
            temp_dir.path().join("cell-biology.json")
        );

        let file = temp_dir.path().join("mine.json");
        assert_eq!(export_target(&file, &capsule), file);
    }
}

//! Status command handler

use anyhow::Result;

use pocket_core::{Config, Store};

use crate::output::{human_size, Output, OutputFormat};

/// Show storage status, optionally rebuilding the capsule index first
pub fn show(store: &mut Store, config: &Config, rebuild: bool, output: &Output) -> Result<()> {
    if rebuild {
        let entries = store.rebuild_index()?;
        output.success(&format!("Rebuilt index with {} capsule(s)", entries));
    }

    let stats = store.stats()?;
    let db_path = config.sqlite_path();
    let db_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "initialized": stats.initialized,
                    "consistent": stats.is_consistent(),
                    "storage": {
                        "data_dir": config.data_dir,
                        "database": db_path,
                        "database_size": db_size
                    },
                    "counts": {
                        "indexed": stats.index_entries,
                        "capsules": stats.capsule_records,
                        "progress": stats.progress_records
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", stats.index_entries);
        }
        OutputFormat::Human => {
            println!("Pocket Classroom Status");
            println!("=======================");
            println!();
            println!("Storage:");
            println!("  Location:    {}", config.data_dir.display());
            println!("  Database:    {}", human_size(db_size));
            println!(
                "  Initialized: {}",
                if stats.initialized { "yes" } else { "no (run `pocket init`)" }
            );
            println!();
            println!("Contents:");
            println!("  Capsules: {}", stats.index_entries);
            println!("  Progress: {}", stats.progress_records);
            if !stats.is_consistent() {
                println!();
                println!(
                    "⚠ Index lists {} capsule(s) but {} are stored; run `pocket status --rebuild`.",
                    stats.index_entries, stats.capsule_records
                );
            }
        }
    }

    Ok(())
}

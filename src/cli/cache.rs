//! Snapshot store management commands

use chrono::Utc;

use crate::cli::{GlobalOptions, OutputFormat};
use crate::output::formatters::{format_age, format_captured_at, format_size, freshness_label};
use k3sync::Result;
use k3sync::cache::SnapshotStore;
use k3sync::config::Config;

fn open_store(opts: &GlobalOptions) -> Result<SnapshotStore> {
    let config = Config::load_at(opts.config_ref())?;
    Ok(SnapshotStore::open_at(&config.cache_dir()?)?)
}

/// Show snapshot store statistics
pub fn status(opts: &GlobalOptions) -> Result<()> {
    let store = open_store(opts)?;
    let stats = store.stats()?;

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries": stats.entries,
                "records": stats.record_count,
                "size_bytes": stats.size_bytes,
                "size_human": format_size(stats.size_bytes),
                "updated_at": stats.updated_at.map(|t| t.timestamp_millis()),
                "fresh": stats.is_fresh(),
                "path": store.path().display().to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!("Snapshot Store");
            println!("────────────────────────────────────────");
            println!("Location:       {}", store.path().display());
            println!("Records:        {}", stats.record_count);
            println!("Payload size:   {}", format_size(stats.size_bytes));

            match stats.updated_at {
                Some(updated_at) => {
                    println!("Captured:       {}", format_captured_at(updated_at));
                    println!(
                        "Age:            {} ({})",
                        format_age(updated_at, Utc::now()),
                        freshness_label(updated_at)
                    );
                }
                None => println!("Captured:       never"),
            }
        }
    }

    Ok(())
}

/// Remove the stored snapshot
pub fn clear(opts: &GlobalOptions) -> Result<()> {
    let stats = open_store(opts)?.clear_all()?;

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries_removed": stats.entries_removed,
                "success": true,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            if stats.entries_removed > 0 {
                println!("Cleared {} stored snapshot(s)", stats.entries_removed);
            } else {
                println!("Snapshot store was already empty");
            }
        }
    }

    Ok(())
}

/// Show the snapshot store location
pub fn path(opts: &GlobalOptions) -> Result<()> {
    let config = Config::load_at(opts.config_ref())?;
    println!("{}", config.cache_dir()?.display());
    Ok(())
}

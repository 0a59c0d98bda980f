//! Sync command: refresh the cache from K3 Cloud and publish the snapshot

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{CommandContext, GlobalOptions, OutputFormat};
use crate::output::formatters::format_captured_at;
use k3sync::cache::PublishedSource;
use k3sync::{CacheSnapshot, Result, SyncScheduler, UpdateCallback};

/// Refresh once, or keep refreshing on the sync schedule with `watch`.
///
/// Every successful refresh writes the durable store and, for a file
/// location, the published snapshot.
pub async fn run(opts: &GlobalOptions, watch: bool, output: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::with_published(opts, output)?;
    ctx.config.credentials()?;

    // Only file locations are written; an http(s) location is read-only
    let published = output.map(Path::to_path_buf).or_else(|| {
        match ctx.config.cache.published.as_deref().map(PublishedSource::parse) {
            Some(PublishedSource::File(path)) => Some(path),
            _ => None,
        }
    });
    let published = published.map(|p| p.display().to_string());
    if published.is_none() && ctx.format == OutputFormat::Table {
        eprintln!(
            "{} No published snapshot file; only the local store is updated",
            "○".dimmed()
        );
    }

    if !watch {
        let spinner = spinner(ctx.format, "Fetching inventory from K3 Cloud...");
        let result = ctx.cache.refresh().await;
        spinner.finish_and_clear();
        let snapshot = result?;
        return report(&snapshot, ctx.format, published.as_deref());
    }

    let scheduler = SyncScheduler::new(ctx.cache.clone());
    let format = ctx.format;
    let callback: UpdateCallback = Arc::new(move |snapshot| {
        if let Err(e) = report(&snapshot, format, published.as_deref()) {
            log::error!("Failed to report sync: {}", e);
        }
    });
    scheduler.start(Some(callback));

    if format == OutputFormat::Table {
        eprintln!("Syncing every 24 hours. Press Ctrl+C to stop.");
    }
    tokio::signal::ctrl_c().await?;
    scheduler.stop();

    Ok(())
}

fn spinner(format: OutputFormat, message: &str) -> ProgressBar {
    if format == OutputFormat::Json {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn report(snapshot: &CacheSnapshot, format: OutputFormat, published: Option<&str>) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "records": snapshot.records.len(),
                "updatedAt": snapshot.captured_at.timestamp_millis(),
                "published": published,
            });
            println!("{}", serde_json::to_string(&json)?);
        }
        OutputFormat::Table => {
            println!(
                "{} Synced {} records at {}",
                "✓".green(),
                snapshot.records.len(),
                format_captured_at(snapshot.captured_at)
            );
            if let Some(location) = published {
                println!("  → Published to {}", location.cyan());
            }
        }
    }
    Ok(())
}

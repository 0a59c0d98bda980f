//! Status command implementation

use chrono::Utc;
use colored::Colorize;

use crate::cli::{GlobalOptions, OutputFormat};
use crate::output::formatters::{format_age, format_captured_at, freshness_label};
use k3sync::Result;
use k3sync::cache::SnapshotStore;
use k3sync::config::Config;

/// Display configuration and snapshot status
pub fn run(opts: &GlobalOptions) -> Result<()> {
    let config_path = Config::resolve_path(opts.config_ref())?;
    let config = Config::load_at(opts.config_ref())?;
    let cache_dir = config.cache_dir()?;
    let stats = SnapshotStore::open_at(&cache_dir)?.stats()?;

    let k3 = &config.k3;
    let credentials = [
        ("server_url", k3.server_url.is_some()),
        ("acct_id", k3.acct_id.is_some()),
        ("app_id", k3.app_id.is_some()),
        ("app_secret", k3.app_secret.is_some()),
        ("user_name", k3.user_name.is_some()),
    ];

    if opts.format == OutputFormat::Json {
        let json = serde_json::json!({
            "config_path": config_path.display().to_string(),
            "config_exists": config_path.exists(),
            "server_url": k3.server_url,
            "credentials": credentials
                .iter()
                .map(|(name, set)| (name.to_string(), serde_json::Value::Bool(*set)))
                .collect::<serde_json::Map<_, _>>(),
            "warehouses": config.warehouses,
            "published": config.cache.published,
            "cache_dir": cache_dir.display().to_string(),
            "snapshot": {
                "records": stats.record_count,
                "updated_at": stats.updated_at.map(|t| t.timestamp_millis()),
                "fresh": stats.is_fresh(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("{}\n", "k3sync Status".bold());

    let exists = if config_path.exists() {
        "".normal()
    } else {
        "(not found, using defaults)".dimmed()
    };
    println!(
        "Config file: {} {}",
        config_path.display().to_string().cyan(),
        exists
    );
    println!();

    match &k3.server_url {
        Some(url) => println!("{} K3 Cloud server: {}", "✓".green(), url.cyan()),
        None => println!("{} K3 Cloud server not configured", "✗".red()),
    }
    for (name, set) in credentials.iter().skip(1) {
        if *set {
            println!("{} {} configured", "✓".green(), name);
        } else {
            println!("{} {} not configured", "✗".red(), name);
        }
    }
    if config.credentials().is_err() {
        println!("  → Set K3SYNC_* variables or edit {}", config_path.display());
    }

    println!();
    println!("Warehouse groups:");
    for group in &config.warehouses {
        println!(
            "  {} {} ({})",
            group.label.bold(),
            group.name,
            group.codes.join(", ").dimmed()
        );
    }

    println!();
    match &config.cache.published {
        Some(published) => println!("{} Published snapshot: {}", "○".dimmed(), published.cyan()),
        None => println!("{} No published snapshot configured", "○".dimmed()),
    }
    println!("{} Snapshot store: {}", "○".dimmed(), cache_dir.display());

    match stats.updated_at {
        Some(updated_at) => println!(
            "  {} records, captured {} ({}, {})",
            stats.record_count,
            format_captured_at(updated_at),
            format_age(updated_at, Utc::now()),
            freshness_label(updated_at)
        ),
        None => println!("  {}", "No snapshot stored yet".dimmed()),
    }
    println!();

    Ok(())
}

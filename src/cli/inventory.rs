//! Snapshot, metrics and hydrate commands

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::cli::{CommandContext, GlobalOptions, OutputFormat, ReadArgs};
use crate::output::display::{MetricDisplay, RowDisplay};
use crate::output::formatters::{format_captured_at, freshness_label};
use crate::output;
use k3sync::metrics::InventoryRow;
use k3sync::{CacheSnapshot, Error, GroupMetric, Result, aggregate_by_group, inventory_rows};

/// Read a snapshot the way `read` asks; never fails
async fn read_snapshot(ctx: &CommandContext, read: ReadArgs) -> Arc<CacheSnapshot> {
    if read.goes_remote() {
        ctx.cache.get_or_stale(read.force).await
    } else {
        ctx.cache.get_snapshot().await
    }
}

fn print_header(snapshot: &CacheSnapshot, format: OutputFormat) {
    if format == OutputFormat::Table {
        println!(
            "Snapshot captured {} ({})",
            format_captured_at(snapshot.captured_at).bold(),
            freshness_label(snapshot.captured_at)
        );
    }
}

/// Print the inventory table of the current snapshot
pub async fn snapshot(opts: &GlobalOptions, read: ReadArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let snapshot = read_snapshot(&ctx, read).await;

    print_header(&snapshot, ctx.format);
    let rows = inventory_rows(&snapshot.records);
    output::print::<InventoryRow, RowDisplay>(&rows, ctx.format)
}

/// Print per-group tonnage of the current snapshot
pub async fn metrics(opts: &GlobalOptions, read: ReadArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let snapshot = read_snapshot(&ctx, read).await;

    print_header(&snapshot, ctx.format);
    let metrics = aggregate_by_group(&snapshot.records, &ctx.config.warehouses);
    output::print::<GroupMetric, MetricDisplay>(&metrics, ctx.format)
}

/// Seed every cache layer from a JSON export
pub async fn hydrate(opts: &GlobalOptions, file: &Path, captured_at: Option<&str>) -> Result<()> {
    let bytes = tokio::fs::read(file).await?;
    let imported = CacheSnapshot::from_import(&bytes)?;
    let captured_at = match captured_at {
        Some(raw) => parse_captured_at(raw)?,
        None => imported.captured_at,
    };

    let ctx = CommandContext::new(opts)?;
    let count = imported.records.len();
    let hydrated = ctx.cache.hydrate(imported.records, Some(captured_at)).await;

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "hydrated": hydrated,
                "records": count,
                "updatedAt": captured_at.timestamp_millis(),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            if hydrated {
                println!(
                    "{} Hydrated cache with {} records captured {}",
                    "✓".green(),
                    count,
                    format_captured_at(captured_at)
                );
            } else {
                println!(
                    "{} {} has no records; cache left unchanged",
                    "○".dimmed(),
                    file.display()
                );
            }
        }
    }
    Ok(())
}

/// Parse an RFC 3339 timestamp or epoch milliseconds
fn parse_captured_at(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| Error::Other(format!("Invalid capture time `{}`", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_captured_at_rfc3339() {
        let dt = parse_captured_at("2025-01-15T12:00:00+08:00").unwrap();
        assert_eq!(dt.timestamp_millis(), 1_736_913_600_000);
    }

    #[test]
    fn test_parse_captured_at_millis() {
        let dt = parse_captured_at("1736942400000").unwrap();
        assert_eq!(dt.timestamp_millis(), 1_736_942_400_000);
    }

    #[test]
    fn test_parse_captured_at_invalid() {
        assert!(parse_captured_at("yesterday").is_err());
    }
}

//! Formatting helpers for timestamps, ages and sizes

use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use k3sync::cache::is_fresh;

/// Local date/time of a capture, or "never" for the empty snapshot.
pub fn format_captured_at(captured_at: DateTime<Utc>) -> String {
    if captured_at == DateTime::<Utc>::default() {
        return "never".to_string();
    }
    captured_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Age relative to `now`.
///
/// # Example output
/// - `2h 15m ago`
/// - `3d 4h ago`
/// - `just now`
pub fn format_age(captured_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = now.signed_duration_since(captured_at).num_seconds();
    if secs < 60 {
        return "just now".to_string();
    }

    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let mins = (secs % 3600) / 60;

    if days > 0 {
        format!("{}d {}h ago", days, hours)
    } else if hours > 0 {
        format!("{}h {}m ago", hours, mins)
    } else {
        format!("{}m ago", mins)
    }
}

/// Colored freshness marker for a capture time
pub fn freshness_label(captured_at: DateTime<Utc>) -> String {
    if captured_at == DateTime::<Utc>::default() {
        "empty".dimmed().to_string()
    } else if is_fresh(captured_at, Utc::now()) {
        "fresh".green().to_string()
    } else {
        "stale".yellow().to_string()
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

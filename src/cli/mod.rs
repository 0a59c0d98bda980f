//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod cache;
pub mod context;
pub mod fetch;
pub mod inventory;
pub mod status;
pub mod sync;

pub use args::{GlobalOptions, OutputFormat, ReadArgs};
pub use context::CommandContext;

/// k3sync - K3 Cloud warehouse inventory, synced and cached
#[derive(Parser, Debug)]
#[command(name = "k3sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "K3SYNC_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "K3SYNC_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "K3SYNC_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show configuration and cache status
    Status,

    /// Query K3 Cloud directly, bypassing the cache
    Fetch {
        /// Warehouse code to query (default: every configured warehouse)
        #[arg(long, short = 'w')]
        warehouse: Option<String>,

        /// Maximum rows per warehouse
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Refresh the cache from K3 Cloud and publish the snapshot
    Sync {
        /// Keep running and refresh every 24 hours until interrupted
        #[arg(long)]
        watch: bool,

        /// Write the published snapshot to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show the cached inventory table
    Snapshot {
        #[command(flatten)]
        read: ReadArgs,
    },

    /// Show stock per warehouse group, in tons
    Metrics {
        #[command(flatten)]
        read: ReadArgs,
    },

    /// Seed the cache from a JSON export
    Hydrate {
        /// Snapshot file (`{"data": [...], "updatedAt": ...}`) or a bare record array
        file: PathBuf,

        /// Capture time (RFC 3339 or epoch milliseconds); defaults to the file's or now
        #[arg(long)]
        captured_at: Option<String>,
    },

    /// Manage the local snapshot store
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Local snapshot store subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show snapshot store statistics
    Status,

    /// Remove the stored snapshot
    Clear,

    /// Print the snapshot store location
    Path,
}

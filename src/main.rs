//! k3sync CLI - K3 Cloud warehouse inventory, synced and cached

use clap::Parser;

mod cli;
mod output;

use cli::{CacheCommands, Cli, Commands, GlobalOptions};
use k3sync::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or everything with `--debug`
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_secs()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Status => cli::status::run(&opts),
        Commands::Fetch { warehouse, limit } => {
            cli::fetch::run(&opts, warehouse.as_deref(), limit).await
        }
        Commands::Sync { watch, output } => cli::sync::run(&opts, watch, output.as_deref()).await,
        Commands::Snapshot { read } => cli::inventory::snapshot(&opts, read).await,
        Commands::Metrics { read } => cli::inventory::metrics(&opts, read).await,
        Commands::Hydrate { file, captured_at } => {
            cli::inventory::hydrate(&opts, &file, captured_at.as_deref()).await
        }
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Status => cli::cache::status(&opts),
            CacheCommands::Clear => cli::cache::clear(&opts),
            CacheCommands::Path => cli::cache::path(&opts),
        },
    }
}

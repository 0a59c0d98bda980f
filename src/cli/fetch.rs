//! Direct K3 Cloud queries

use colored::Colorize;
use log::debug;

use crate::cli::GlobalOptions;
use crate::cli::context::k3_client;
use crate::output::{self, display::RecordDisplay};
use k3sync::config::Config;
use k3sync::{InventoryApi, InventoryRecord, Result, query_all_warehouses};

/// Query one warehouse, or every configured warehouse, without touching the cache
pub async fn run(opts: &GlobalOptions, warehouse: Option<&str>, limit: Option<usize>) -> Result<()> {
    let config = Config::load_at(opts.config_ref())?;
    let client = k3_client(&config)?;
    let limit = limit.unwrap_or(config.k3.page_limit);

    let records: Vec<InventoryRecord> = match warehouse {
        Some(code) => {
            debug!("Querying warehouse {} (limit {})", code, limit);
            client.query_inventory(code, limit).await?
        }
        None => {
            let codes = config.query_codes();
            let report = query_all_warehouses(&client, &codes, limit).await;
            for (code, err) in &report.failed {
                eprintln!("{} warehouse {}: {}", "⚠".yellow(), code, err);
            }
            report.into_records()?
        }
    };

    output::print::<InventoryRecord, RecordDisplay>(&records, opts.format)
}

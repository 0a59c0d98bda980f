//! Command execution context
//!
//! Loads configuration once and wires the cache layers and K3 client from it.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::cli::{GlobalOptions, OutputFormat};
use k3sync::cache::{PublishedSnapshot, PublishedSource, SnapshotStore};
use k3sync::config::Config;
use k3sync::{ApiError, CacheBuilder, InventoryApi, InventoryCache, InventoryRecord, K3CloudClient, Result};

/// Context for command execution.
pub struct CommandContext {
    /// Loaded configuration, env overrides applied
    pub config: Config,
    /// Cache over the configured layers
    pub cache: InventoryCache,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Build a context with the configured published snapshot location.
    ///
    /// Missing credentials are not an error here: local reads still work and
    /// any fetch fails with [`ApiError::NotConfigured`].
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        Self::with_published(opts, None)
    }

    /// Build a context, publishing to `published` instead of the configured location
    pub fn with_published(opts: &GlobalOptions, published: Option<&Path>) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?;
        config.validate_warehouses()?;

        let client: Arc<dyn InventoryApi> = match k3_client(&config) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                debug!("K3 Cloud client unavailable: {}", e);
                Arc::new(Unconfigured(e.to_string()))
            }
        };

        let store = SnapshotStore::open_at(&config.cache_dir()?)?;
        let mut builder = CacheBuilder::new(client)
            .warehouses(config.query_codes())
            .limit(config.k3.page_limit)
            .durable(store);

        let source = match published {
            Some(path) => Some(PublishedSource::File(path.to_path_buf())),
            None => config.cache.published.as_deref().map(PublishedSource::parse),
        };
        if let Some(source) = source {
            debug!("Published snapshot: {}", source);
            builder = builder.published(PublishedSnapshot::new(source));
        }

        Ok(Self {
            cache: builder.build(),
            config,
            format: opts.format,
        })
    }
}

/// Build a K3 client, failing when credentials are missing
pub fn k3_client(config: &Config) -> Result<K3CloudClient> {
    let creds = config.credentials()?;
    K3CloudClient::new(&creds, &config.k3)
}

/// Stand-in client used when K3 credentials are not configured
struct Unconfigured(String);

#[async_trait]
impl InventoryApi for Unconfigured {
    async fn query_inventory(
        &self,
        _warehouse_code: &str,
        _limit: usize,
    ) -> std::result::Result<Vec<InventoryRecord>, ApiError> {
        Err(ApiError::NotConfigured(self.0.clone()))
    }
}

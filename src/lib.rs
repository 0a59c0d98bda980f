//! k3sync - warehouse inventory from K3 Cloud, kept warm in a tiered cache
//!
//! Consumers build one [`InventoryCache`] (memory, durable store, published
//! snapshot, K3 fetch), hand it to a [`SyncScheduler`] to keep it fresh, and
//! read snapshots from it on their own cadence.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod signing;
pub mod sync;
pub mod warehouse;

pub use cache::{CACHE_TTL, CacheBuilder, CacheSnapshot, InventoryCache};
pub use client::{InventoryApi, InventoryRecord, K3CloudClient, query_all_warehouses};
pub use error::{ApiError, Error, Result};
pub use metrics::{GroupMetric, aggregate_by_group, inventory_rows};
pub use sync::{SyncScheduler, UpdateCallback};
pub use warehouse::{WarehouseGroup, default_groups};

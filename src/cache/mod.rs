//! Tiered inventory cache
//!
//! Lookup goes memory → durable local store → published snapshot → K3 fetch,
//! with one freshness policy ([`CACHE_TTL`]) shared by every layer.

pub mod hierarchy;
pub mod published;
pub mod storage;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::InventoryRecord;
use crate::error::CacheError;

pub use hierarchy::{CacheBuilder, InventoryCache};
pub use published::{PublishedSnapshot, PublishedSource};
pub use storage::SnapshotStore;

/// Snapshot lifetime. The sync interval is the same value, so a scheduled
/// refresh lands before the cache goes stale.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Key of the single snapshot kept in the durable store
pub const CACHE_KEY: &str = "k3-inventory-cache";

/// Whether a snapshot captured at `captured_at` is still fresh at `now`
pub fn is_fresh(captured_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let ttl = TimeDelta::milliseconds(CACHE_TTL.as_millis() as i64);
    now.signed_duration_since(captured_at) < ttl
}

/// A complete inventory capture.
///
/// Snapshots are immutable: every write replaces the whole snapshot in a layer.
/// The serialized form is the published-file shape
/// `{"data": [...], "updatedAt": <epoch millis>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(rename = "data")]
    pub records: Vec<InventoryRecord>,

    #[serde(rename = "updatedAt", with = "chrono::serde::ts_milliseconds")]
    pub captured_at: DateTime<Utc>,
}

impl CacheSnapshot {
    pub fn new(records: Vec<InventoryRecord>, captured_at: DateTime<Utc>) -> Self {
        Self {
            records,
            captured_at,
        }
    }

    /// The snapshot served before anything has ever been cached
    pub fn empty() -> Self {
        Self::new(Vec::new(), DateTime::<Utc>::default())
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        is_fresh(self.captured_at, now)
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    /// Parse a snapshot payload; shape mismatches are [`CacheError::Corrupt`].
    pub fn from_json(bytes: &[u8]) -> Result<Self, CacheError> {
        serde_json::from_slice(bytes).map_err(|e| CacheError::Corrupt(e.to_string()))
    }

    /// Parse an import file: either a snapshot payload, or a bare array of
    /// records (captured now).
    pub fn from_import(bytes: &[u8]) -> Result<Self, CacheError> {
        if let Ok(snapshot) = Self::from_json(bytes) {
            return Ok(snapshot);
        }
        let records: Vec<InventoryRecord> =
            serde_json::from_slice(bytes).map_err(|e| CacheError::Corrupt(e.to_string()))?;
        Ok(Self::new(records, Utc::now()))
    }
}

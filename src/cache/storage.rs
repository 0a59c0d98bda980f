//! SQLite-backed durable snapshot store
//!
//! Holds the latest snapshot under a fixed key, scoped to one installation.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

use super::CacheSnapshot;
use crate::error::CacheError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, CacheError>;

/// Durable snapshot storage
pub struct SnapshotStore {
    conn: Connection,
    path: PathBuf,
}

impl SnapshotStore {
    /// Open or create the store at the default XDG cache location
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::default_dir()?)
    }

    /// Get the cache directory path (~/.cache/k3sync on Linux)
    pub fn default_dir() -> Result<PathBuf> {
        let cache_base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(cache_base.join("k3sync"))
    }

    /// Open the store in a specific directory
    pub fn open_at(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .map_err(|e| CacheError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = cache_dir.join("inventory.db");
        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| CacheError::Io(format!("Failed to remove cache DB: {}", e)))?;
            return Self::open_at(cache_dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                cache_key TEXT PRIMARY KEY NOT NULL,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                record_count INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn,
            path: db_path,
        })
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot stored under `key`, fresh or not.
    ///
    /// A payload that no longer parses is reported as [`CacheError::Corrupt`].
    pub fn load(&self, key: &str) -> Result<Option<CacheSnapshot>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots WHERE cache_key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(payload) => CacheSnapshot::from_json(payload.as_bytes()).map(Some),
            None => Ok(None),
        }
    }

    /// Replace the snapshot stored under `key`
    pub fn store(&self, key: &str, snapshot: &CacheSnapshot) -> Result<()> {
        let payload =
            serde_json::to_string(snapshot).map_err(|e| CacheError::Corrupt(e.to_string()))?;

        self.conn.execute(
            "INSERT OR REPLACE INTO snapshots
             (cache_key, payload, updated_at, record_count, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                payload,
                snapshot.captured_at.timestamp_millis(),
                snapshot.records.len() as i64,
                payload.len() as i64
            ],
        )?;
        Ok(())
    }

    /// Store a raw payload, bypassing serialization (for corruption tests)
    #[cfg(test)]
    pub(crate) fn store_raw(&self, key: &str, payload: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO snapshots
             (cache_key, payload, updated_at, record_count, size_bytes)
             VALUES (?1, ?2, 0, 0, ?3)",
            params![key, payload, payload.len() as i64],
        )?;
        Ok(())
    }

    /// Remove every stored snapshot
    pub fn clear_all(&self) -> Result<ClearStats> {
        let removed = self.conn.execute("DELETE FROM snapshots", [])?;
        Ok(ClearStats {
            entries_removed: removed,
        })
    }

    /// Get store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let row: Option<(i64, i64, i64)> = self
            .conn
            .query_row(
                "SELECT updated_at, record_count, size_bytes FROM snapshots
                 ORDER BY updated_at DESC LIMIT 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        let entries: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |r| r.get(0))?;

        Ok(match row {
            Some((updated_at, record_count, size_bytes)) => StoreStats {
                entries: entries as usize,
                record_count: record_count as usize,
                size_bytes: size_bytes as usize,
                updated_at: DateTime::<Utc>::from_timestamp_millis(updated_at),
            },
            None => StoreStats {
                entries: entries as usize,
                ..Default::default()
            },
        })
    }
}

/// Statistics about a clear operation
#[derive(Debug)]
pub struct ClearStats {
    pub entries_removed: usize,
}

/// Statistics about the durable store
#[derive(Debug, Default)]
pub struct StoreStats {
    pub entries: usize,
    pub record_count: usize,
    pub size_bytes: usize,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoreStats {
    /// Whether the newest stored snapshot is still fresh
    pub fn is_fresh(&self) -> bool {
        self.updated_at
            .map(|at| super::is_fresh(at, Utc::now()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InventoryRecord;
    use crate::cache::CACHE_KEY;
    use tempfile::TempDir;

    fn test_store() -> (SnapshotStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::open_at(dir.path()).unwrap();
        (store, dir)
    }

    fn snapshot(n: usize) -> CacheSnapshot {
        let records = (0..n)
            .map(|i| InventoryRecord {
                material_code: format!("M{i}"),
                material_name: "Steel".to_string(),
                warehouse_code: "CK0201".to_string(),
                warehouse_name: "Finished".to_string(),
                quantity: i as f64,
            })
            .collect();
        CacheSnapshot::new(
            records,
            DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap(),
        )
    }

    #[test]
    fn test_store_and_load() {
        let (store, _dir) = test_store();
        let snap = snapshot(3);

        store.store(CACHE_KEY, &snap).unwrap();

        assert_eq!(store.load(CACHE_KEY).unwrap(), Some(snap));
    }

    #[test]
    fn test_load_missing() {
        let (store, _dir) = test_store();
        assert_eq!(store.load(CACHE_KEY).unwrap(), None);
    }

    #[test]
    fn test_store_replaces() {
        let (store, _dir) = test_store();
        store.store(CACHE_KEY, &snapshot(5)).unwrap();
        store.store(CACHE_KEY, &snapshot(2)).unwrap();

        let loaded = store.load(CACHE_KEY).unwrap().unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(store.stats().unwrap().entries, 1);
    }

    #[test]
    fn test_corrupt_payload() {
        let (store, _dir) = test_store();
        store.store_raw(CACHE_KEY, r#"{"rows": []}"#).unwrap();

        assert!(matches!(
            store.load(CACHE_KEY),
            Err(CacheError::Corrupt(_))
        ));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = SnapshotStore::open_at(dir.path()).unwrap();
            store.store(CACHE_KEY, &snapshot(1)).unwrap();
        }

        let store = SnapshotStore::open_at(dir.path()).unwrap();
        assert!(store.load(CACHE_KEY).unwrap().is_some());
    }

    #[test]
    fn test_schema_mismatch_rebuilds() {
        let dir = TempDir::new().unwrap();
        {
            let store = SnapshotStore::open_at(dir.path()).unwrap();
            store.store(CACHE_KEY, &snapshot(1)).unwrap();
            store
                .conn
                .pragma_update(None, "user_version", SCHEMA_VERSION + 1)
                .unwrap();
        }

        let store = SnapshotStore::open_at(dir.path()).unwrap();
        assert_eq!(store.load(CACHE_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_and_stats() {
        let (store, _dir) = test_store();
        store.store(CACHE_KEY, &snapshot(4)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.record_count, 4);
        assert!(stats.size_bytes > 0);
        assert!(stats.is_fresh());

        assert_eq!(store.clear_all().unwrap().entries_removed, 1);
        let stats = store.stats().unwrap();
        assert_eq!(stats.entries, 0);
        assert!(stats.updated_at.is_none());
        assert!(!stats.is_fresh());
    }
}

//! The cache hierarchy itself.
//!
//! [`InventoryCache`] owns every layer plus the in-flight refresh, so each
//! instance is an independent cache (tests build a fresh one per case).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, info, warn};
use tokio::sync::watch;

use super::{CACHE_KEY, CacheSnapshot, PublishedSnapshot, SnapshotStore};
use crate::client::{DEFAULT_QUERY_LIMIT, InventoryApi, InventoryRecord, query_all_warehouses};
use crate::error::ApiError;
use crate::warehouse::{default_groups, default_query_order, query_codes};

/// Outcome of a refresh, shared by every caller awaiting it
pub type RefreshResult = Result<Arc<CacheSnapshot>, ApiError>;

type SharedRefresh = Shared<BoxFuture<'static, RefreshResult>>;

/// Builder for [`InventoryCache`]
pub struct CacheBuilder {
    client: Arc<dyn InventoryApi>,
    codes: Vec<String>,
    limit: usize,
    durable: Option<SnapshotStore>,
    published: Option<PublishedSnapshot>,
}

impl CacheBuilder {
    /// Start from the built-in warehouse groups with no durable or published layer.
    pub fn new(client: Arc<dyn InventoryApi>) -> Self {
        Self {
            client,
            codes: query_codes(&default_groups(), &default_query_order()),
            limit: DEFAULT_QUERY_LIMIT,
            durable: None,
            published: None,
        }
    }

    /// Warehouse codes fetched on refresh, in result order
    pub fn warehouses(mut self, codes: Vec<String>) -> Self {
        self.codes = codes;
        self
    }

    /// Row limit per warehouse query
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn durable(mut self, store: SnapshotStore) -> Self {
        self.durable = Some(store);
        self
    }

    pub fn published(mut self, published: PublishedSnapshot) -> Self {
        self.published = Some(published);
        self
    }

    pub fn build(self) -> InventoryCache {
        let (updates, _) = watch::channel(Arc::new(CacheSnapshot::empty()));
        InventoryCache {
            inner: Arc::new(Inner {
                client: self.client,
                codes: self.codes,
                limit: self.limit,
                memory: RwLock::new(None),
                durable: self.durable.map(|store| Arc::new(Mutex::new(store))),
                published: self.published,
                inflight: Mutex::new(None),
                updates,
                remote_fetches: AtomicUsize::new(0),
            }),
        }
    }
}

/// Handle to a tiered inventory cache.
///
/// Cloning is cheap; clones share the same layers and in-flight refresh.
#[derive(Clone)]
pub struct InventoryCache {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn InventoryApi>,
    codes: Vec<String>,
    limit: usize,
    /// `None` until something has been loaded or written
    memory: RwLock<Option<Arc<CacheSnapshot>>>,
    /// SQLite is blocking; every access runs on the blocking pool
    durable: Option<Arc<Mutex<SnapshotStore>>>,
    published: Option<PublishedSnapshot>,
    inflight: Mutex<Option<SharedRefresh>>,
    updates: watch::Sender<Arc<CacheSnapshot>>,
    remote_fetches: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Current time truncated to the millisecond precision snapshots are stored at
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

impl InventoryCache {
    /// The in-memory snapshot, or an empty one if nothing is loaded yet
    pub fn current(&self) -> Arc<CacheSnapshot> {
        self.inner
            .memory_snapshot()
            .unwrap_or_else(|| Arc::new(CacheSnapshot::empty()))
    }

    /// Capture time of the in-memory snapshot
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.memory_snapshot().map(|s| s.captured_at)
    }

    /// Best snapshot available without touching the network.
    ///
    /// Memory first, then the durable store regardless of age (promoted into
    /// memory), then an empty snapshot.
    pub async fn get_snapshot(&self) -> Arc<CacheSnapshot> {
        if let Some(snapshot) = self.inner.memory_snapshot() {
            return snapshot;
        }
        match self.inner.load_durable().await {
            Some(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.inner.promote(Arc::clone(&snapshot));
                snapshot
            }
            None => Arc::new(CacheSnapshot::empty()),
        }
    }

    /// Layered read: fresh memory, fresh durable, fresh published, then a
    /// remote fetch. `force` skips straight to the fetch.
    pub async fn get_with_refresh(&self, force: bool) -> RefreshResult {
        if !force {
            if let Some(snapshot) = self.lookup_fresh().await {
                return Ok(snapshot);
            }
        }
        self.refresh().await
    }

    /// Like [`get_with_refresh`](Self::get_with_refresh) but never fails:
    /// a failed fetch serves the best stale snapshot instead.
    pub async fn get_or_stale(&self, force: bool) -> Arc<CacheSnapshot> {
        match self.get_with_refresh(force).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Inventory refresh failed, serving cached data: {}", e);
                self.best_stale().await
            }
        }
    }

    /// Fetch from K3 and write the result to every layer.
    ///
    /// Concurrent callers share one in-flight fetch. When every warehouse
    /// fails the error is returned and the cached layers are left untouched.
    pub async fn refresh(&self) -> RefreshResult {
        let refresh = {
            let mut slot = lock(&self.inner.inflight);
            match slot.as_ref() {
                Some(running) => {
                    debug!("Joining in-flight inventory refresh");
                    running.clone()
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let running = async move {
                        let result = inner.fetch_and_store().await;
                        *lock(&inner.inflight) = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(running.clone());
                    running
                }
            }
        };
        refresh.await
    }

    /// Seed every layer with externally supplied records (e.g. an import).
    ///
    /// An empty record set is ignored and returns `false`. `captured_at`
    /// defaults to now.
    pub async fn hydrate(
        &self,
        records: Vec<InventoryRecord>,
        captured_at: Option<DateTime<Utc>>,
    ) -> bool {
        if records.is_empty() {
            debug!("Ignoring hydrate with no records");
            return false;
        }
        let snapshot = CacheSnapshot::new(records, captured_at.unwrap_or_else(now_millis));
        info!("Hydrating cache with {} records", snapshot.records.len());
        self.inner.store_all(Arc::new(snapshot)).await;
        true
    }

    /// Receive every newly captured or hydrated snapshot from now on.
    ///
    /// Promotions of already stored snapshots between layers are not sent.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheSnapshot>> {
        self.inner.updates.subscribe()
    }

    /// Number of remote fan-outs performed by this cache
    pub fn remote_fetches(&self) -> usize {
        self.inner.remote_fetches.load(Ordering::SeqCst)
    }

    async fn lookup_fresh(&self) -> Option<Arc<CacheSnapshot>> {
        let now = Utc::now();

        if let Some(snapshot) = self.inner.memory_snapshot() {
            if snapshot.is_fresh_at(now) {
                debug!("Cache hit: memory");
                return Some(snapshot);
            }
        }

        if let Some(snapshot) = self.inner.load_durable().await {
            if snapshot.is_fresh_at(now) {
                debug!("Cache hit: durable store");
                let snapshot = Arc::new(snapshot);
                self.inner.promote(Arc::clone(&snapshot));
                return Some(snapshot);
            }
            debug!("Durable snapshot is stale");
        }

        if let Some(snapshot) = self.inner.load_published().await {
            if snapshot.is_fresh_at(now) {
                debug!("Cache hit: published snapshot");
                let snapshot = Arc::new(snapshot);
                self.inner.promote(Arc::clone(&snapshot));
                self.inner.store_durable(Arc::clone(&snapshot)).await;
                return Some(snapshot);
            }
            debug!("Published snapshot is stale");
        }

        debug!("Cache miss on every layer");
        None
    }

    /// Newest snapshot held by any layer, of any age
    async fn best_stale(&self) -> Arc<CacheSnapshot> {
        let candidates = [
            self.inner.memory_snapshot().map(|s| (*s).clone()),
            self.inner.load_durable().await,
            self.inner.load_published().await,
        ];
        candidates
            .into_iter()
            .flatten()
            .max_by_key(|s| s.captured_at)
            .map(Arc::new)
            .unwrap_or_else(|| Arc::new(CacheSnapshot::empty()))
    }
}

impl Inner {
    fn memory_snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.memory
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Put an already stored snapshot into memory without notifying subscribers
    fn promote(&self, snapshot: Arc<CacheSnapshot>) {
        *self
            .memory
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot);
    }

    /// Put a new snapshot into memory and notify subscribers
    fn replace_memory(&self, snapshot: Arc<CacheSnapshot>) {
        self.promote(Arc::clone(&snapshot));
        self.updates.send_replace(snapshot);
    }

    async fn load_durable(&self) -> Option<CacheSnapshot> {
        let durable = Arc::clone(self.durable.as_ref()?);
        match tokio::task::spawn_blocking(move || lock(&durable).load(CACHE_KEY)).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!("Ignoring unreadable durable snapshot: {}", e);
                None
            }
            Err(e) => {
                warn!("Durable store read did not complete: {}", e);
                None
            }
        }
    }

    async fn store_durable(&self, snapshot: Arc<CacheSnapshot>) {
        let Some(durable) = self.durable.as_ref().map(Arc::clone) else {
            return;
        };
        match tokio::task::spawn_blocking(move || lock(&durable).store(CACHE_KEY, &snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to write durable snapshot: {}", e),
            Err(e) => warn!("Durable store write did not complete: {}", e),
        }
    }

    async fn load_published(&self) -> Option<CacheSnapshot> {
        let published = self.published.as_ref()?;
        match published.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "Ignoring unreadable published snapshot {}: {}",
                    published.source(),
                    e
                );
                None
            }
        }
    }

    /// Replace the snapshot in memory, the durable store and the published file
    async fn store_all(&self, snapshot: Arc<CacheSnapshot>) {
        self.replace_memory(Arc::clone(&snapshot));
        self.store_durable(Arc::clone(&snapshot)).await;

        if let Some(published) = &self.published {
            match published.publish(&snapshot).await {
                Ok(true) => debug!("Published snapshot to {}", published.source()),
                Ok(false) => {}
                Err(e) => warn!("Failed to publish snapshot: {}", e),
            }
        }
    }

    async fn fetch_and_store(&self) -> RefreshResult {
        self.remote_fetches.fetch_add(1, Ordering::SeqCst);
        let report = query_all_warehouses(self.client.as_ref(), &self.codes, self.limit).await;
        let failed = report.failed.len();
        let attempted = report.attempted;
        let records = report.into_records()?;

        info!(
            "Fetched {} inventory records ({} of {} warehouses failed)",
            records.len(),
            failed,
            attempted
        );

        let snapshot = Arc::new(CacheSnapshot::new(records, now_millis()));
        self.store_all(Arc::clone(&snapshot)).await;
        Ok(snapshot)
    }
}

//! Background refresh of the inventory cache
//!
//! The scheduler refreshes once on start and then every [`CACHE_TTL`], so a
//! scheduled refresh always lands before the cached snapshot goes stale.
//! Refreshes go through [`InventoryCache::refresh`], which coalesces them with
//! any on-demand refresh already in flight.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::{CACHE_TTL, CacheSnapshot, InventoryCache};

/// Called with every snapshot a scheduled refresh produces
pub type UpdateCallback = Arc<dyn Fn(Arc<CacheSnapshot>) + Send + Sync>;

/// Periodic refresher for one [`InventoryCache`]
pub struct SyncScheduler {
    cache: InventoryCache,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SyncScheduler {
    pub fn new(cache: InventoryCache) -> Self {
        Self {
            cache,
            interval: CACHE_TTL,
            task: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &InventoryCache {
        &self.cache
    }

    /// Refresh now, then every interval until stopped.
    ///
    /// Starting again replaces the running timer. Must be called from within
    /// a Tokio runtime.
    pub fn start(&self, on_update: Option<UpdateCallback>) {
        let mut task = lock(&self.task);
        if let Some(previous) = task.take() {
            debug!("Replacing running sync timer");
            previous.abort();
        }

        let cache = self.cache.clone();
        let period = self.interval;
        info!("Starting inventory sync every {}h", period.as_secs() / 3600);

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match cache.refresh().await {
                    Ok(snapshot) => {
                        info!("Scheduled sync stored {} records", snapshot.records.len());
                        if let Some(callback) = &on_update {
                            callback(snapshot);
                        }
                    }
                    Err(e) => error!("Scheduled inventory sync failed: {}", e),
                }
            }
        }));
    }

    /// Cancel the timer. Returns whether one was running.
    pub fn stop(&self) -> bool {
        match lock(&self.task).take() {
            Some(task) => {
                task.abort();
                info!("Stopped inventory sync");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Force a refresh now and return the in-memory snapshot.
    ///
    /// A failed refresh leaves the previous snapshot in place and returns it.
    pub async fn manual_update(&self) -> Arc<CacheSnapshot> {
        if let Err(e) = self.cache.refresh().await {
            warn!("Manual inventory sync failed: {}", e);
        }
        self.cache.current()
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }
}

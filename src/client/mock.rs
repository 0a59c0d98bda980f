//! Mock inventory client for testing
//!
//! Scripted per-warehouse rows, failures and latency, with call tracking, so
//! the fan-out, cache and scheduler can be exercised without a K3 server.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{InventoryApi, InventoryRecord};
use crate::error::ApiError;

/// Mock K3 client.
///
/// # Example
/// ```ignore
/// let mock = MockInventoryClient::new()
///     .with_rows("CK0201", vec![MockInventoryClient::record("M1", "CK0201", 1000.0)])
///     .with_failure("CK0102", ApiError::Forbidden);
/// ```
#[derive(Default)]
pub struct MockInventoryClient {
    /// Rows returned per warehouse; unknown warehouses return no rows
    rows: Mutex<HashMap<String, Vec<InventoryRecord>>>,
    /// Warehouses that fail on every call
    failures: Mutex<HashMap<String, ApiError>>,
    /// Fail every warehouse, regardless of `failures`
    fail_all: Mutex<Option<ApiError>>,
    /// Artificial latency per warehouse
    delays: Mutex<HashMap<String, Duration>>,
    /// Latency applied to every warehouse without its own delay
    default_delay: Mutex<Option<Duration>>,
    /// Calls per warehouse
    calls: Mutex<HashMap<String, usize>>,
    /// Limits passed, in call order
    limits: Mutex<Vec<usize>>,
    total_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockInventoryClient {
    /// Create a mock with no rows and no failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a record
    pub fn record(material_code: &str, warehouse_code: &str, quantity: f64) -> InventoryRecord {
        InventoryRecord {
            material_code: material_code.to_string(),
            material_name: format!("{material_code} name"),
            warehouse_code: warehouse_code.to_string(),
            warehouse_name: format!("{warehouse_code} name"),
            quantity,
        }
    }

    /// Configure rows returned for `warehouse`.
    pub fn with_rows(self, warehouse: &str, rows: Vec<InventoryRecord>) -> Self {
        self.set_rows(warehouse, rows);
        self
    }

    /// Make every query for `warehouse` fail with `error`.
    pub fn with_failure(self, warehouse: &str, error: ApiError) -> Self {
        lock(&self.failures).insert(warehouse.to_string(), error);
        self
    }

    /// Delay every query for `warehouse` by `delay`.
    pub fn with_delay(self, warehouse: &str, delay: Duration) -> Self {
        lock(&self.delays).insert(warehouse.to_string(), delay);
        self
    }

    /// Delay every query without a per-warehouse delay.
    pub fn with_default_delay(self, delay: Duration) -> Self {
        *lock(&self.default_delay) = Some(delay);
        self
    }

    /// Replace the rows for `warehouse` after construction.
    pub fn set_rows(&self, warehouse: &str, rows: Vec<InventoryRecord>) {
        lock(&self.rows).insert(warehouse.to_string(), rows);
    }

    /// Fail (or stop failing) every warehouse.
    pub fn set_fail_all(&self, error: Option<ApiError>) {
        *lock(&self.fail_all) = error;
    }

    /// Total queries issued
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Queries issued for one warehouse
    pub fn calls_for(&self, warehouse: &str) -> usize {
        lock(&self.calls).get(warehouse).copied().unwrap_or(0)
    }

    /// Highest number of concurrently running queries observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Limits passed to each query, in call order
    pub fn limits(&self) -> Vec<usize> {
        lock(&self.limits).clone()
    }

    fn delay_for(&self, warehouse: &str) -> Option<Duration> {
        lock(&self.delays)
            .get(warehouse)
            .copied()
            .or(*lock(&self.default_delay))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl InventoryApi for MockInventoryClient {
    async fn query_inventory(
        &self,
        warehouse_code: &str,
        limit: usize,
    ) -> Result<Vec<InventoryRecord>, ApiError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.calls)
            .entry(warehouse_code.to_string())
            .or_insert(0) += 1;
        lock(&self.limits).push(limit);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay_for(warehouse_code) {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = lock(&self.fail_all).clone() {
            return Err(err);
        }
        if let Some(err) = lock(&self.failures).get(warehouse_code) {
            return Err(err.clone());
        }

        let rows = lock(&self.rows)
            .get(warehouse_code)
            .cloned()
            .unwrap_or_default();
        Ok(rows.into_iter().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_configured_rows() {
        let mock = MockInventoryClient::new()
            .with_rows("A", vec![MockInventoryClient::record("M1", "A", 5.0)]);

        let rows = mock.query_inventory("A", 100).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(mock.query_inventory("B", 100).await.unwrap().is_empty());
        assert_eq!(mock.total_calls(), 2);
        assert_eq!(mock.calls_for("A"), 1);
    }

    #[tokio::test]
    async fn test_mock_respects_limit() {
        let mock = MockInventoryClient::new().with_rows(
            "A",
            vec![
                MockInventoryClient::record("M1", "A", 1.0),
                MockInventoryClient::record("M2", "A", 2.0),
            ],
        );

        assert_eq!(mock.query_inventory("A", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_fail_all_toggle() {
        let mock = MockInventoryClient::new();
        mock.set_fail_all(Some(ApiError::Forbidden));
        assert!(mock.query_inventory("A", 1).await.is_err());

        mock.set_fail_all(None);
        assert!(mock.query_inventory("A", 1).await.is_ok());
    }
}

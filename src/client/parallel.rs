//! Fan-out of warehouse queries.
//!
//! Every configured warehouse is queried concurrently, so total latency is
//! bounded by the slowest warehouse rather than the sum. A failing warehouse
//! only removes its own rows from the aggregate.

use std::future::Future;
use std::pin::Pin;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};

use super::{InventoryApi, InventoryRecord};
use crate::error::ApiError;

/// Type alias for the boxed per-warehouse futures
type WarehouseFuture<'a> = Pin<
    Box<dyn Future<Output = (usize, Result<Vec<InventoryRecord>, ApiError>)> + Send + 'a>,
>;

/// Outcome of a fan-out across warehouses
#[derive(Debug, Default)]
pub struct AggregateReport {
    /// Rows of every warehouse that answered, in warehouse configuration order
    pub records: Vec<InventoryRecord>,

    /// Warehouses whose query failed, with the failure
    pub failed: Vec<(String, ApiError)>,

    /// Number of warehouses queried
    pub attempted: usize,
}

impl AggregateReport {
    /// True when some, but not all, warehouses failed
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && self.failed.len() < self.attempted
    }

    /// True when every queried warehouse failed
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed.len() == self.attempted
    }

    /// Records of the aggregate, or an error when every warehouse failed
    pub fn into_records(self) -> Result<Vec<InventoryRecord>, ApiError> {
        if self.all_failed() {
            return Err(ApiError::AllWarehousesFailed {
                attempted: self.attempted,
            });
        }
        Ok(self.records)
    }
}

/// Query every warehouse in `codes` concurrently and concatenate the results.
///
/// Failures are logged and recorded in [`AggregateReport::failed`]; they never
/// abort the other queries. Rows keep the order of `codes`, regardless of
/// which warehouse answered first.
pub async fn query_all_warehouses<C>(client: &C, codes: &[String], limit: usize) -> AggregateReport
where
    C: InventoryApi + ?Sized,
{
    if codes.is_empty() {
        return AggregateReport::default();
    }

    debug!("Querying {} warehouses concurrently", codes.len());

    let mut futures: FuturesUnordered<WarehouseFuture<'_>> = codes
        .iter()
        .enumerate()
        .map(|(index, code)| {
            Box::pin(async move { (index, client.query_inventory(code, limit).await) })
                as WarehouseFuture<'_>
        })
        .collect();

    let mut slots: Vec<Option<Result<Vec<InventoryRecord>, ApiError>>> =
        (0..codes.len()).map(|_| None).collect();

    while let Some((index, result)) = futures.next().await {
        slots[index] = Some(result);
    }

    let mut report = AggregateReport {
        attempted: codes.len(),
        ..Default::default()
    };

    for (code, slot) in codes.iter().zip(slots) {
        match slot {
            Some(Ok(rows)) => {
                debug!("Warehouse {} returned {} rows", code, rows.len());
                report.records.extend(rows);
            }
            Some(Err(err)) => {
                warn!("Query for warehouse {} failed: {}", code, err);
                report.failed.push((code.clone(), err));
            }
            None => {}
        }
    }

    debug!(
        "Fetched {} rows from {} of {} warehouses",
        report.records.len(),
        report.attempted - report.failed.len(),
        report.attempted
    );
    report
}

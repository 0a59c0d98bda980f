//! K3 Cloud inventory client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub mod k3cloud;
#[cfg(test)]
pub mod mock;
pub mod parallel;

pub use k3cloud::K3CloudClient;
#[cfg(test)]
pub use mock::MockInventoryClient;
pub use parallel::{AggregateReport, query_all_warehouses};

/// Default row limit for a single warehouse query
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Source of per-warehouse inventory rows
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Fetch up to `limit` inventory rows stored in `warehouse_code`
    async fn query_inventory(
        &self,
        warehouse_code: &str,
        limit: usize,
    ) -> Result<Vec<InventoryRecord>, ApiError>;
}

/// One inventory row: a material held in a warehouse.
///
/// Quantities are in base units (kilograms). Records are not unique per
/// material/warehouse pair; duplicates returned by K3 are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    /// Material number (`FmaterialID.Fnumber`)
    pub material_code: String,

    /// Material name
    pub material_name: String,

    /// Warehouse number (`FStockID.Fnumber`)
    pub warehouse_code: String,

    /// Warehouse name
    pub warehouse_name: String,

    /// Base quantity in kilograms
    #[serde(default)]
    pub quantity: f64,
}

impl InventoryRecord {
    /// Map one positional K3 row (code, name, warehouse code, warehouse name,
    /// quantity) into a record.
    ///
    /// Missing or non-string cells become empty strings. The quantity accepts
    /// a number or a numeric string and falls back to 0.
    pub fn from_row(row: &[serde_json::Value]) -> Self {
        let text = |i: usize| match row.get(i) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let quantity = match row.get(4) {
            Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(serde_json::Value::String(s)) => parse_leading_float(s),
            _ => 0.0,
        };

        Self {
            material_code: text(0),
            material_name: text(1),
            warehouse_code: text(2),
            warehouse_name: text(3),
            quantity: if quantity.is_finite() { quantity } else { 0.0 },
        }
    }
}

/// Parse `s` as a number, falling back to its longest numeric prefix
/// (`"12.5kg"` is 12.5), or 0 when there is none.
fn parse_leading_float(s: &str) -> f64 {
    let s = s.trim();
    if let Ok(value) = s.parse::<f64>() {
        return value;
    }

    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i == digits_start || &s[digits_start..i] == "." {
        return 0.0;
    }
    let mut end = i;

    // An exponent only counts when at least one digit follows it
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'-' | b'+')) {
            j += 1;
        }
        let exp_digits = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_digits {
            end = j;
        }
    }

    s[..end].parse().unwrap_or(0.0)
}

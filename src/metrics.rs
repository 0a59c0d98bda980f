//! Inventory metrics for the dashboard
//!
//! Reduces raw records into per-group tonnage and into the rows of the
//! inventory table.

use serde::{Deserialize, Serialize};

use crate::client::InventoryRecord;
use crate::warehouse::WarehouseGroup;

/// Unit reported with group tonnage
pub const TON_UNIT: &str = "吨";

/// Total stock held by one warehouse group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMetric {
    pub key: String,
    pub label: String,
    pub name: String,
    /// Tons, rounded to two decimals
    pub value_in_tons: f64,
    pub unit: String,
    pub color: String,
    pub total: f64,
}

/// Sum record quantities (kg) per group and convert them to tons.
///
/// One metric per group, in the order of `groups`. A group with no matching
/// records reports 0.
pub fn aggregate_by_group(records: &[InventoryRecord], groups: &[WarehouseGroup]) -> Vec<GroupMetric> {
    groups
        .iter()
        .map(|group| {
            let total_kg: f64 = records
                .iter()
                .filter(|r| group.contains(&r.warehouse_code))
                .map(|r| r.quantity)
                .sum();
            let tons = round2(total_kg / 1000.0);

            GroupMetric {
                key: group.key.clone(),
                label: group.label.clone(),
                name: group.name.clone(),
                value_in_tons: tons,
                unit: TON_UNIT.to_string(),
                color: group.color.clone(),
                total: tons,
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    if value.is_finite() {
        (value * 100.0).round() / 100.0
    } else {
        0.0
    }
}

/// One row of the dashboard inventory table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub id: String,
    pub name: String,
    pub code: String,
    pub warehouse: String,
    pub quantity: i64,
    pub available: i64,
}

/// Table rows for records with stock on hand.
///
/// When no record has a positive quantity every record is shown instead.
// NOTE: the all-zero fallback is kept as the dashboard has always behaved;
// whether an all-zero table should render empty is still an open product question.
pub fn inventory_rows(records: &[InventoryRecord]) -> Vec<InventoryRow> {
    let in_stock: Vec<&InventoryRecord> = records.iter().filter(|r| r.quantity > 0.0).collect();
    let source: Vec<&InventoryRecord> = if in_stock.is_empty() {
        records.iter().collect()
    } else {
        in_stock
    };

    source
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let id = if record.material_code.is_empty() {
                format!("inv-{index}")
            } else {
                format!("{}-{}", record.material_code, index)
            };
            let quantity = if record.quantity.is_finite() {
                record.quantity.round() as i64
            } else {
                0
            };
            InventoryRow {
                id,
                name: record.material_name.clone(),
                code: record.material_code.clone(),
                warehouse: record.warehouse_name.clone(),
                quantity,
                available: quantity,
            }
        })
        .collect()
}

//! Table rows for inventory data
//!
//! Display models turn library types into CLI columns. JSON output serializes
//! the library types directly.

use tabled::Tabled;

use k3sync::metrics::InventoryRow;
use k3sync::{GroupMetric, InventoryRecord};

/// Raw K3 record, as fetched
#[derive(Debug, Clone, Tabled)]
pub struct RecordDisplay {
    #[tabled(rename = "MATERIAL")]
    pub material_code: String,

    #[tabled(rename = "NAME")]
    pub material_name: String,

    #[tabled(rename = "WAREHOUSE")]
    pub warehouse_code: String,

    #[tabled(rename = "WAREHOUSE NAME")]
    pub warehouse_name: String,

    #[tabled(rename = "QTY (KG)")]
    pub quantity: String,
}

impl From<&InventoryRecord> for RecordDisplay {
    fn from(record: &InventoryRecord) -> Self {
        Self {
            material_code: record.material_code.clone(),
            material_name: record.material_name.clone(),
            warehouse_code: record.warehouse_code.clone(),
            warehouse_name: record.warehouse_name.clone(),
            quantity: format!("{:.2}", record.quantity),
        }
    }
}

/// Dashboard inventory table row
#[derive(Debug, Clone, Tabled)]
pub struct RowDisplay {
    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "CODE")]
    pub code: String,

    #[tabled(rename = "WAREHOUSE")]
    pub warehouse: String,

    #[tabled(rename = "QUANTITY")]
    pub quantity: i64,

    #[tabled(rename = "AVAILABLE")]
    pub available: i64,
}

impl From<&InventoryRow> for RowDisplay {
    fn from(row: &InventoryRow) -> Self {
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            code: row.code.clone(),
            warehouse: row.warehouse.clone(),
            quantity: row.quantity,
            available: row.available,
        }
    }
}

/// Group tonnage
#[derive(Debug, Clone, Tabled)]
pub struct MetricDisplay {
    #[tabled(rename = "GROUP")]
    pub label: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "STOCK")]
    pub value: String,

    #[tabled(rename = "COLOR")]
    pub color: String,
}

impl From<&GroupMetric> for MetricDisplay {
    fn from(metric: &GroupMetric) -> Self {
        Self {
            label: metric.label.clone(),
            name: metric.name.clone(),
            value: format!("{:.2} {}", metric.value_in_tons, metric.unit),
            color: metric.color.clone(),
        }
    }
}

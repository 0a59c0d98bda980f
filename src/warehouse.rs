//! Warehouse group layout
//!
//! Groups are static configuration: each names a fixed set of K3 warehouse
//! codes. Group order drives metric rendering; queries fan out in a separate
//! order given by group keys (see [`DEFAULT_QUERY_ORDER`]).

use serde::{Deserialize, Serialize};

/// A named logical grouping of warehouses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseGroup {
    /// Stable key (`finished`, `rawMaterial`, ...)
    pub key: String,

    /// Label reported in group metrics
    pub label: String,

    /// Human-readable display name
    pub name: String,

    /// Chart color
    pub color: String,

    /// K3 warehouse codes (`FStockID.Fnumber`) belonging to this group
    pub codes: Vec<String>,
}

impl WarehouseGroup {
    fn builtin(key: &str, name: &str, color: &str, codes: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            label: format!("{key}-group"),
            name: name.to_string(),
            color: color.to_string(),
            codes: codes.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Whether `code` belongs to this group
    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }
}

/// The four warehouse groups of the plant, in display order.
pub fn default_groups() -> Vec<WarehouseGroup> {
    vec![
        WarehouseGroup::builtin("finished", "成品仓", "#3b82f6", &["104", "CK0201"]),
        WarehouseGroup::builtin(
            "rawMaterial",
            "原材料仓",
            "#f59e0b",
            &["CK0102", "CK0202", "CK1001"],
        ),
        WarehouseGroup::builtin("semiFinished", "半成品仓", "#06b6d4", &["CK0104"]),
        WarehouseGroup::builtin(
            "workshop",
            "车间仓",
            "#10b981",
            &["CK0103", "CK0203", "CK0301"],
        ),
    ]
}

/// Group keys in the order their warehouses are queried and their rows concatenated
pub const DEFAULT_QUERY_ORDER: [&str; 4] = ["rawMaterial", "workshop", "semiFinished", "finished"];

pub fn default_query_order() -> Vec<String> {
    DEFAULT_QUERY_ORDER.iter().map(|k| k.to_string()).collect()
}

/// Warehouse codes to query, groups arranged by `order` (a list of group keys).
///
/// Groups missing from `order` follow in configuration order; unknown keys are
/// skipped. Codes are deduplicated as in [`all_codes`].
pub fn query_codes(groups: &[WarehouseGroup], order: &[String]) -> Vec<String> {
    let mut arranged: Vec<WarehouseGroup> = order
        .iter()
        .filter_map(|key| groups.iter().find(|g| &g.key == key))
        .cloned()
        .collect();
    for group in groups {
        if !arranged.iter().any(|g| g.key == group.key) {
            arranged.push(group.clone());
        }
    }
    all_codes(&arranged)
}

/// All warehouse codes across `groups`, in configuration order.
///
/// A code listed in more than one group is queried once, at its first position.
pub fn all_codes(groups: &[WarehouseGroup]) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for code in groups.iter().flat_map(|g| g.codes.iter()) {
        if !codes.contains(code) {
            codes.push(code.clone());
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_groups_order() {
        let keys: Vec<_> = default_groups().into_iter().map(|g| g.key).collect();
        assert_eq!(
            keys,
            vec!["finished", "rawMaterial", "semiFinished", "workshop"]
        );
    }

    #[test]
    fn test_default_labels() {
        let groups = default_groups();
        assert_eq!(groups[0].label, "finished-group");
        assert_eq!(groups[1].label, "rawMaterial-group");
    }

    #[test]
    fn test_contains() {
        let groups = default_groups();
        assert!(groups[0].contains("CK0201"));
        assert!(!groups[0].contains("CK0102"));
    }

    #[test]
    fn test_all_codes_order_and_dedup() {
        let mut groups = default_groups();
        groups[3].codes.push("CK0201".to_string());

        let codes = all_codes(&groups);
        assert_eq!(codes.len(), 9);
        assert_eq!(codes[0], "104");
        assert_eq!(codes[1], "CK0201");
        assert_eq!(codes.last().map(String::as_str), Some("CK0301"));
    }

    #[test]
    fn test_default_query_codes() {
        let codes = query_codes(&default_groups(), &default_query_order());
        assert_eq!(
            codes,
            vec![
                "CK0102", "CK0202", "CK1001", "CK0103", "CK0203", "CK0301", "CK0104", "104",
                "CK0201",
            ]
        );
    }

    #[test]
    fn test_query_codes_appends_unlisted_groups() {
        let order = vec!["workshop".to_string(), "nope".to_string()];
        let codes = query_codes(&default_groups(), &order);
        assert_eq!(&codes[..4], &["CK0103", "CK0203", "CK0301", "104"]);
        assert_eq!(codes.len(), 9);
    }
}

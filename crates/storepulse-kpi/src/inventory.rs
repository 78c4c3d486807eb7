//! Inventory valuation
//!
//! Stock value is on-hand quantity times the product's unit price, joined by
//! SKU against the product catalog. SKUs missing from the catalog are valued
//! at 0 but still count as products and units.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use storepulse_core::types::{InventoryLine, Product};

/// Stock held by one warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseStock {
    pub warehouse: String,
    pub name: String,
    /// Inventory lines (distinct SKUs) in the warehouse
    pub products: usize,
    pub units: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InventoryValuation {
    pub total_value: f64,
    /// Distinct SKUs across all warehouses
    pub unique_products: usize,
    pub total_units: f64,
    /// Ordered by value descending, then name
    pub by_warehouse: Vec<WarehouseStock>,
}

impl InventoryValuation {
    pub fn warehouse_count(&self) -> usize {
        self.by_warehouse.len()
    }
}

/// Value a deduplicated inventory listing.
///
/// `names` maps warehouse codes to display names; unknown codes are shown
/// as-is.
pub fn value_inventory(
    lines: &[InventoryLine],
    products: &[Product],
    names: &HashMap<String, String>,
) -> InventoryValuation {
    let prices: HashMap<&str, f64> = products
        .iter()
        .map(|p| (p.sku.as_str(), p.unit_price()))
        .collect();

    let mut skus: HashSet<&str> = HashSet::new();
    let mut warehouses: HashMap<&str, WarehouseStock> = HashMap::new();
    let mut valuation = InventoryValuation::default();

    for line in lines {
        let units = line.quantity();
        let value = units * prices.get(line.sku.as_str()).copied().unwrap_or(0.0);

        skus.insert(line.sku.as_str());
        valuation.total_units += units;
        valuation.total_value += value;

        let stock = warehouses
            .entry(line.warehouse.as_str())
            .or_insert_with(|| WarehouseStock {
                warehouse: line.warehouse.clone(),
                name: names
                    .get(&line.warehouse)
                    .filter(|n| !n.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| line.warehouse.clone()),
                products: 0,
                units: 0.0,
                value: 0.0,
            });
        stock.products += 1;
        stock.units += units;
        stock.value += value;
    }

    valuation.unique_products = skus.len();
    valuation.by_warehouse = warehouses.into_values().collect();
    valuation.by_warehouse.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.name.cmp(&b.name))
    });
    valuation
}

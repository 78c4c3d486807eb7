//! Global inventory overview

use crate::dashboard::{Dashboard, scopes};
use crate::view::ViewQuery;
use crate::views::catalog::shared_error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use storepulse_cache::{CachePolicy, FetchResult, Trigger};
use storepulse_core::types::InventoryLine;
use storepulse_core::{CollectionQuery, DimensionFilter, Record, TraversalStats};
use storepulse_kpi::{InventoryValuation, value_inventory};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryOverview {
    pub valuation: InventoryValuation,
    pub stats: TraversalStats,
    /// The product catalog used for prices was itself truncated
    pub prices_truncated: bool,
}

impl InventoryOverview {
    /// Either the stock listing or the price list is partial
    pub fn is_lower_bound(&self) -> bool {
        self.stats.truncated || self.prices_truncated
    }
}

impl Dashboard {
    /// Stock valuation across warehouses, or for one warehouse
    pub fn inventory_overview_query(&self, warehouse: Option<&str>) -> ViewQuery<InventoryOverview> {
        let mut query = CollectionQuery::new(InventoryLine::COLLECTION);
        if let Some(warehouse) = warehouse {
            query = query.with_dimension(DimensionFilter::Warehouse(warehouse.to_string()));
        }
        let key = query.cache_key(scopes::INVENTORY_OVERVIEW);
        let dashboard = self.clone();

        ViewQuery::new(key, CachePolicy::DASHBOARD, move |cancel| async move {
            let outcome = dashboard
                .traverse(
                    dashboard.sources.inventory.clone(),
                    dashboard.limits.inventory,
                    &query,
                    &cancel,
                )
                .await?;

            let products = dashboard.products().await.map_err(shared_error)?;
            let names: HashMap<String, String> = match dashboard.warehouses().await {
                Ok(catalog) => catalog
                    .items
                    .iter()
                    .map(|w| (w.id.clone(), w.name.clone()))
                    .collect(),
                Err(e) => {
                    warn!(error = %e, "warehouse catalog unavailable, labelling by id");
                    HashMap::new()
                }
            };

            Ok(InventoryOverview {
                valuation: value_inventory(&outcome.records, &products.items, &names),
                stats: outcome.stats,
                prices_truncated: products.stats.truncated,
            })
        })
    }

    pub async fn inventory_overview(&self, warehouse: Option<&str>) -> FetchResult<InventoryOverview> {
        self.inventory_overview_query(warehouse)
            .load(&self.store, Trigger::Mount)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::{TestSources, inventory_line, product};
    use storepulse_core::types::Warehouse;

    fn sources() -> TestSources {
        TestSources::new()
            .inventory(vec![
                inventory_line("A1", "main", "10"),
                inventory_line("A2", "main", "4"),
                inventory_line("A1", "outlet", "2"),
                inventory_line("ZZ", "outlet", "7"),
            ])
            .products(vec![
                product("A1", Some("Acme"), None, "3.50"),
                product("A2", Some("Acme"), None, "10"),
            ])
            .warehouses(vec![Warehouse {
                id: "main".into(),
                name: "Main Depot".into(),
                active: true,
            }])
    }

    #[tokio::test]
    async fn test_inventory_overview_values_stock() {
        let overview = sources()
            .dashboard()
            .inventory_overview(None)
            .await
            .unwrap();

        let valuation = &overview.valuation;
        assert_eq!(valuation.total_value, 35.0 + 40.0 + 7.0);
        assert_eq!(valuation.unique_products, 3);
        assert_eq!(valuation.total_units, 23.0);
        assert_eq!(valuation.warehouse_count(), 2);
        assert_eq!(valuation.by_warehouse[0].name, "Main Depot");
        assert_eq!(valuation.by_warehouse[0].value, 75.0);
        assert_eq!(valuation.by_warehouse[1].name, "outlet");
        assert!(!overview.is_lower_bound());
    }

    #[tokio::test]
    async fn test_product_invalidation_refreshes_inventory() {
        let sources = sources();
        let inventory = sources.inventory_source();
        let dashboard = sources.dashboard();

        dashboard.inventory_overview(None).await.unwrap();
        dashboard.inventory_overview(None).await.unwrap();
        assert_eq!(inventory.pages_served(), 1);

        assert_eq!(dashboard.invalidate_products(), 2);
        dashboard.inventory_overview(None).await.unwrap();
        assert_eq!(inventory.pages_served(), 2);
    }

    #[tokio::test]
    async fn test_warehouse_filter_is_a_separate_entry() {
        let sources = sources();
        let inventory = sources.inventory_source();
        let dashboard = sources.dashboard();

        dashboard.inventory_overview(None).await.unwrap();
        dashboard.inventory_overview(Some("main")).await.unwrap();
        assert_eq!(inventory.pages_served(), 2);
    }
}

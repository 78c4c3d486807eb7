//! Reference catalogs and the product catalog KPIs

use crate::dashboard::{Dashboard, scopes};
use crate::view::ViewQuery;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storepulse_cache::{CachePolicy, FetchResult, Trigger};
use storepulse_core::types::{Branch, Product, Warehouse};
use storepulse_core::{CollectionQuery, CollectionSource, Error, Record, TraversalStats};
use storepulse_kpi::{ProductSummary, summarize_products};
use storepulse_traversal::TraversalLimits;

/// A fully traversed reference list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog<R> {
    pub items: Vec<R>,
    pub stats: TraversalStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductKpis {
    pub summary: ProductSummary,
    pub stats: TraversalStats,
}

impl Dashboard {
    fn catalog_query<R: Record>(
        &self,
        scope: &'static str,
        source: Arc<dyn CollectionSource<R>>,
        limits: TraversalLimits,
        policy: CachePolicy,
    ) -> ViewQuery<Catalog<R>> {
        let query = CollectionQuery::new(R::COLLECTION);
        let key = query.cache_key(scope);
        let dashboard = self.clone();

        ViewQuery::new(key, policy, move |cancel| async move {
            let outcome = dashboard.traverse(source, limits, &query, &cancel).await?;
            Ok(Catalog {
                items: outcome.records,
                stats: outcome.stats,
            })
        })
    }

    pub fn branches_query(&self) -> ViewQuery<Catalog<Branch>> {
        self.catalog_query(
            scopes::BRANCHES,
            self.sources.branches.clone(),
            self.limits.catalog,
            CachePolicy::CATALOG,
        )
    }

    pub async fn branches(&self) -> FetchResult<Catalog<Branch>> {
        self.branches_query().load(&self.store, Trigger::Mount).await
    }

    pub fn warehouses_query(&self) -> ViewQuery<Catalog<Warehouse>> {
        self.catalog_query(
            scopes::WAREHOUSES,
            self.sources.warehouses.clone(),
            self.limits.catalog,
            CachePolicy::CATALOG,
        )
    }

    pub async fn warehouses(&self) -> FetchResult<Catalog<Warehouse>> {
        self.warehouses_query().load(&self.store, Trigger::Mount).await
    }

    pub fn products_query(&self) -> ViewQuery<Catalog<Product>> {
        self.catalog_query(
            scopes::PRODUCTS,
            self.sources.products.clone(),
            self.limits.products,
            CachePolicy::PRODUCTS,
        )
    }

    pub async fn products(&self) -> FetchResult<Catalog<Product>> {
        self.products_query().load(&self.store, Trigger::Mount).await
    }

    /// Product count, brands and lines, derived from the cached catalog
    pub fn product_kpis_query(&self) -> ViewQuery<ProductKpis> {
        let key = CollectionQuery::new(Product::COLLECTION).cache_key(scopes::PRODUCT_KPIS);
        let dashboard = self.clone();

        ViewQuery::new(key, CachePolicy::PRODUCTS, move |_cancel| async move {
            let catalog = dashboard.products().await.map_err(shared_error)?;
            Ok(ProductKpis {
                summary: summarize_products(&catalog.items),
                stats: catalog.stats,
            })
        })
    }

    pub async fn product_kpis(&self) -> FetchResult<ProductKpis> {
        self.product_kpis_query()
            .load(&self.store, Trigger::Mount)
            .await
    }
}

/// Unwrap an error shared between coalesced consumers
pub(crate) fn shared_error(error: Arc<Error>) -> Error {
    Arc::try_unwrap(error).unwrap_or_else(|shared| (*shared).clone())
}

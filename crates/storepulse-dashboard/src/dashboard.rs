//! Dashboard facade
//!
//! Owns the collection sources, the per-view traversal limits and the event
//! sink, and serves every view through an injected [`QueryStore`]. Views are
//! defined in [`crate::views`].

use crate::config::{DashboardConfig, ViewLimits};
use crate::sources::Sources;
use std::sync::Arc;
use storepulse_cache::{Janitor, QueryStore, spawn_janitor};
use storepulse_core::{CollectionQuery, EventSink, QueryKey, Record, Result, TracingSink};
use storepulse_egress::{HttpCollection, SessionListener};
use storepulse_traversal::{CancellationToken, Traversal, TraversalLimits, TraversalOutcome};
use tracing::info;

/// Cache scopes, one per view
pub mod scopes {
    pub const SALES_KPIS: &str = "sales-kpis";
    pub const DASHBOARD_SALES: &str = "dashboard-sales";
    pub const LATEST_SALES: &str = "latest-sales";
    pub const INVENTORY_OVERVIEW: &str = "inventory-overview";
    pub const PRODUCTS: &str = "products";
    pub const PRODUCT_KPIS: &str = "product-kpis";
    pub const BRANCHES: &str = "branches";
    pub const WAREHOUSES: &str = "warehouses";
}

#[derive(Clone)]
pub struct Dashboard {
    pub(crate) sources: Sources,
    pub(crate) limits: ViewLimits,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) store: QueryStore,
}

impl Dashboard {
    pub fn new(sources: Sources, store: QueryStore) -> Self {
        Self {
            sources,
            limits: ViewLimits::default(),
            sink: TracingSink::shared(),
            store,
        }
    }

    /// Build the HTTP-backed dashboard described by `config`
    pub fn from_config(
        config: &DashboardConfig,
        store: QueryStore,
        session: Arc<dyn SessionListener>,
    ) -> Result<Self> {
        config.limits.validate()?;
        let collection = HttpCollection::new(config.api.clone(), config.http.clone())?
            .with_session_listener(session);

        info!(base_url = %config.api.base_url, "dashboard data layer ready");
        Ok(Self::new(Sources::http(collection), store).with_limits(config.limits))
    }

    pub fn with_limits(mut self, limits: ViewLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sink receiving traversal events; the store keeps its own
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &QueryStore {
        &self.store
    }

    pub fn limits(&self) -> &ViewLimits {
        &self.limits
    }

    /// Run retention sweeps on this dashboard's store every `interval`
    pub fn start_janitor(&self, interval: std::time::Duration) -> Janitor {
        spawn_janitor(self.store.clone(), interval)
    }

    /// Mark every cached entry under `prefix` stale.
    ///
    /// Mutation paths call this after writing; in-flight loads for matching
    /// keys are detached and their results discarded.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.store.invalidate(prefix)
    }

    /// Invalidate every view derived from sales
    pub fn invalidate_sales(&self) -> usize {
        [scopes::SALES_KPIS, scopes::DASHBOARD_SALES, scopes::LATEST_SALES]
            .into_iter()
            .map(|scope| self.invalidate(&QueryKey::new(scope)))
            .sum()
    }

    /// Invalidate stock views
    pub fn invalidate_inventory(&self) -> usize {
        self.invalidate(&QueryKey::new(scopes::INVENTORY_OVERVIEW))
    }

    /// Invalidate the product catalog and the views priced from it
    pub fn invalidate_products(&self) -> usize {
        [
            scopes::PRODUCTS,
            scopes::PRODUCT_KPIS,
            scopes::INVENTORY_OVERVIEW,
        ]
        .into_iter()
        .map(|scope| self.invalidate(&QueryKey::new(scope)))
        .sum()
    }

    pub(crate) async fn traverse<R: Record>(
        &self,
        source: Arc<dyn storepulse_core::CollectionSource<R>>,
        limits: TraversalLimits,
        query: &CollectionQuery,
        cancel: &CancellationToken,
    ) -> Result<TraversalOutcome<R>> {
        Traversal::new(source, limits)
            .with_sink(self.sink.clone())
            .run(query, cancel)
            .await
    }
}

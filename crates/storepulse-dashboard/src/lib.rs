//! StorePulse Dashboard
//!
//! The dashboard-facing data layer: configuration, the collection sources
//! and one logical query per view (sales KPIs, overview, live sales table,
//! inventory overview, product catalog KPIs, branch and warehouse catalogs),
//! all served through an injected [`storepulse_cache::QueryStore`].

pub mod config;
pub mod dashboard;
pub mod sources;
pub mod view;
pub mod views;

pub use config::{CacheConfig, DashboardConfig, ViewLimits};
pub use dashboard::{Dashboard, scopes};
pub use sources::Sources;
pub use view::ViewQuery;
pub use views::catalog::{Catalog, ProductKpis};
pub use views::inventory::InventoryOverview;
pub use views::overview::{OverviewParams, SalesOverview};
pub use views::sales::{SalesFilter, SalesKpis};

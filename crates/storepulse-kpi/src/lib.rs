//! StorePulse KPI aggregation
//!
//! Pure functions turning a deduplicated record set into dashboard numbers:
//! scalar totals, per-day series, group-by breakdowns with percentages, the
//! recent-activity list, and the catalog and inventory summaries. Every
//! monetary or quantity field goes through [`storepulse_core::to_number`].

pub mod aggregate;
pub mod breakdown;
pub mod catalog;
pub mod fact;
pub mod inventory;
pub mod recent;
pub mod scalar;
pub mod series;

pub use aggregate::{AggregationOptions, AggregationResult, aggregate};
pub use breakdown::{Breakdown, BreakdownSpec, GroupAccumulator, GroupShare, payment_label};
pub use catalog::{ProductSummary, distinct_values, summarize_products};
pub use fact::{Fact, GroupBy, Recency};
pub use inventory::{InventoryValuation, WarehouseStock, value_inventory};
pub use recent::recent_activity;
pub use scalar::{ScalarKpis, scalar_kpis};
pub use series::{SeriesPoint, daily_series};

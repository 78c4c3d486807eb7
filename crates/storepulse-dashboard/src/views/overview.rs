//! Dashboard overview: KPIs, daily trend, branch and payment breakdowns,
//! recent sales

use crate::dashboard::{Dashboard, scopes};
use crate::view::ViewQuery;
use crate::views::sales::SalesFilter;
use chrono::NaiveDate;
use std::collections::HashMap;
use storepulse_cache::{CachePolicy, FetchResult, Trigger};
use storepulse_core::types::Sale;
use storepulse_kpi::{AggregationOptions, AggregationResult, BreakdownSpec, GroupBy, aggregate};
use tracing::{debug, warn};

/// Overview parameters; every field changes the result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OverviewParams {
    pub filter: SalesFilter,
    /// Last day of the trend window, inclusive
    pub end_day: NaiveDate,
    pub trend_days: usize,
    pub recent: usize,
}

impl OverviewParams {
    pub fn new(filter: SalesFilter, end_day: NaiveDate) -> Self {
        Self {
            filter,
            end_day,
            trend_days: 7,
            recent: 5,
        }
    }

    pub fn trend_days(mut self, days: usize) -> Self {
        self.trend_days = days;
        self
    }

    pub fn recent(mut self, k: usize) -> Self {
        self.recent = k;
        self
    }
}

pub type SalesOverview = AggregationResult<Sale>;

impl Dashboard {
    pub fn overview_query(&self, params: &OverviewParams) -> ViewQuery<SalesOverview> {
        let query = params.filter.query();
        let key = query
            .cache_key(scopes::DASHBOARD_SALES)
            .segment(format!("end={}", params.end_day.format("%Y-%m-%d")))
            .segment(format!("days={}", params.trend_days))
            .segment(format!("recent={}", params.recent));
        let options = AggregationOptions::new(params.end_day)
            .with_trend_days(params.trend_days)
            .with_recent(params.recent);
        let dashboard = self.clone();
        let own_key = key.clone();

        ViewQuery::new(key, CachePolicy::DASHBOARD, move |cancel| async move {
            let outcome = dashboard
                .traverse(
                    dashboard.sources.sales.clone(),
                    dashboard.limits.dashboard_sales,
                    &query,
                    &cancel,
                )
                .await?;

            let labels = match dashboard.branch_names().await {
                Some(labels) => labels,
                None => {
                    // Raising the invalidation floor keeps this result out of the cache
                    dashboard.store.invalidate(&own_key);
                    debug!(key = %own_key, "overview labelled by branch code, not cached");
                    HashMap::new()
                }
            };
            let options = options
                .with_breakdown(BreakdownSpec::new(GroupBy::Branch).with_labels(labels))
                .with_breakdown(BreakdownSpec::new(GroupBy::PaymentMethod));

            Ok(aggregate(&outcome.records, &options, outcome.stats))
        })
    }

    pub async fn overview(&self, params: &OverviewParams) -> FetchResult<SalesOverview> {
        self.overview_query(params)
            .load(&self.store, Trigger::Mount)
            .await
    }

    /// Branch code to display name; `None` when the catalog is unavailable
    async fn branch_names(&self) -> Option<HashMap<String, String>> {
        match self.branches().await {
            Ok(catalog) => Some(
                catalog
                    .items
                    .iter()
                    .map(|b| (b.code.clone(), b.name.clone()))
                    .collect(),
            ),
            Err(e) => {
                warn!(error = %e, "branch catalog unavailable, labelling groups by code");
                None
            }
        }
    }
}

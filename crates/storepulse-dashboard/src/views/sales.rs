//! Sales KPI summary, the live sales table and the latest-sales list

use crate::dashboard::{Dashboard, scopes};
use crate::view::ViewQuery;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use storepulse_cache::{CachePolicy, FetchResult, Trigger};
use storepulse_core::types::Sale;
use storepulse_core::{
    CollectionQuery, CollectionSource, DimensionFilter, Error, PageRequest, Record,
    TraversalStats,
};
use storepulse_kpi::{Recency, scalar_kpis};
use storepulse_traversal::PageFeed;

/// Period and branch selection shared by the sales views
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalesFilter {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
    pub branch: Option<String>,
    /// Request cancelled sales too; the KPIs count them separately
    #[serde(default = "default_include_cancelled")]
    pub include_cancelled: bool,
}

fn default_include_cancelled() -> bool {
    true
}

impl SalesFilter {
    pub fn since(from: NaiveDate) -> Self {
        Self {
            from,
            to: None,
            branch: None,
            include_cancelled: true,
        }
    }

    pub fn until(mut self, to: NaiveDate) -> Self {
        self.to = Some(to);
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn include_cancelled(mut self, include: bool) -> Self {
        self.include_cancelled = include;
        self
    }

    pub fn query(&self) -> CollectionQuery {
        let mut query = CollectionQuery::new(Sale::COLLECTION)
            .from_date(self.from)
            .include_inactive(self.include_cancelled);
        if let Some(to) = self.to {
            query = query.to_date(to);
        }
        if let Some(ref branch) = self.branch {
            query = query.with_dimension(DimensionFilter::Branch(branch.clone()));
        }
        query
    }
}

/// Headline sales numbers for a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesKpis {
    /// Sum of active sale totals
    pub total: f64,
    pub average_ticket: f64,
    /// Active sales
    pub transactions: usize,
    pub cancelled: usize,
    pub stats: TraversalStats,
}

impl Dashboard {
    pub fn sales_kpis_query(&self, filter: &SalesFilter) -> ViewQuery<SalesKpis> {
        let query = filter.query();
        let key = query.cache_key(scopes::SALES_KPIS);
        let dashboard = self.clone();

        ViewQuery::new(key, CachePolicy::KPI_SUMMARY, move |cancel| async move {
            let outcome = dashboard
                .traverse(
                    dashboard.sources.sales.clone(),
                    dashboard.limits.sales_kpis,
                    &query,
                    &cancel,
                )
                .await?;
            let scalars = scalar_kpis(&outcome.records);
            Ok(SalesKpis {
                total: scalars.total,
                average_ticket: scalars.average,
                transactions: scalars.active_count,
                cancelled: scalars.inactive_count,
                stats: outcome.stats,
            })
        })
    }

    pub async fn sales_kpis(&self, filter: &SalesFilter) -> FetchResult<SalesKpis> {
        self.sales_kpis_query(filter)
            .load(&self.store, Trigger::Mount)
            .await
    }

    /// First page of sales for the period, newest first
    pub fn latest_sales_query(&self, filter: &SalesFilter, limit: usize) -> ViewQuery<Vec<Sale>> {
        let query = filter.query();
        let key = query
            .cache_key(scopes::LATEST_SALES)
            .segment(format!("limit={}", limit));
        let source = self.sources.sales.clone();

        ViewQuery::new(key, CachePolicy::LIVE_TABLE, move |cancel| async move {
            if limit == 0 {
                return Err(Error::InvalidLimits("limit must be greater than 0".into()));
            }
            let page_request = PageRequest::first(limit);
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                page = source.fetch_page(&query, &page_request) => page?,
            };
            let mut items = page.items;
            items.sort_by_key(|sale| {
                std::cmp::Reverse(Recency::parse(&sale.issued_at, sale.sale_id))
            });
            Ok(items)
        })
    }

    pub async fn latest_sales(&self, filter: &SalesFilter, limit: usize) -> FetchResult<Vec<Sale>> {
        self.latest_sales_query(filter, limit)
            .load(&self.store, Trigger::Mount)
            .await
    }

    /// Infinite-scroll feed over the period's sales.
    ///
    /// Not cached; a new feed starts from the first page.
    pub fn sales_table(&self, filter: &SalesFilter, search: Option<&str>) -> PageFeed<Sale> {
        let mut query = filter.query();
        if let Some(search) = search {
            query = query.with_search(search);
        }
        PageFeed::new(
            self.sources.sales.clone(),
            query,
            self.limits.table_page_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::test_support::{dashboard_with_sales, sale};
    use storepulse_core::StopReason;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    #[test]
    fn test_filter_query_includes_cancelled() {
        let query = SalesFilter::since(jan(1)).branch("north").query();
        assert!(query.include_inactive);
        assert_eq!(query.collection, "/sales");
        assert_eq!(
            query.dimension,
            Some(DimensionFilter::Branch("north".into()))
        );

        let active_only = SalesFilter::since(jan(1)).include_cancelled(false).query();
        assert!(!active_only.include_inactive);
    }

    #[test]
    fn test_filter_defaults_to_cancelled_when_deserialized() {
        let filter: SalesFilter =
            serde_json::from_str(r#"{"from": "2025-01-01", "to": null, "branch": null}"#).unwrap();
        assert!(filter.include_cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_inclusion_is_a_separate_view_entry() {
        let (dashboard, source) = dashboard_with_sales(vec![
            sale(2, "2025-01-02", "north", "80", false),
            sale(1, "2025-01-01", "north", "20", true),
        ]);
        let with_cancelled = SalesFilter::since(jan(1));
        let active_only = SalesFilter::since(jan(1)).include_cancelled(false);

        let overview_all = dashboard.overview_query(&crate::OverviewParams::new(
            with_cancelled.clone(),
            jan(2),
        ));
        let overview_active =
            dashboard.overview_query(&crate::OverviewParams::new(active_only.clone(), jan(2)));
        assert_ne!(overview_all.key(), overview_active.key());
        assert_ne!(
            dashboard.sales_kpis_query(&with_cancelled).key(),
            dashboard.sales_kpis_query(&active_only).key()
        );

        dashboard
            .overview(&crate::OverviewParams::new(with_cancelled, jan(2)))
            .await
            .unwrap();
        dashboard
            .overview(&crate::OverviewParams::new(active_only, jan(2)))
            .await
            .unwrap();
        assert_eq!(source.pages_served(), 2);
        assert_eq!(dashboard.store().len(), 3);
    }

    #[tokio::test]
    async fn test_sales_kpis_scenario() {
        let (dashboard, _) = dashboard_with_sales(vec![
            sale(3, "2025-01-03", "north", "100.00", false),
            sale(2, "2025-01-02", "north", "200.00", false),
            sale(1, "2025-01-01", "south", "500.00", true),
        ]);

        let kpis = dashboard
            .sales_kpis(&SalesFilter::since(jan(1)))
            .await
            .unwrap();
        assert_eq!(kpis.total, 300.0);
        assert_eq!(kpis.average_ticket, 150.0);
        assert_eq!(kpis.transactions, 2);
        assert_eq!(kpis.cancelled, 1);
        assert!(!kpis.stats.truncated);
        assert_eq!(kpis.stats.stop_reason, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_sales_kpis_truncated_at_cap() {
        let sales: Vec<Sale> = (1..=1500)
            .rev()
            .map(|id| sale(id, "2025-01-05", "north", "1", false))
            .collect();
        let (dashboard, source) = dashboard_with_sales(sales);

        let kpis = dashboard
            .sales_kpis(&SalesFilter::since(jan(1)))
            .await
            .unwrap();
        assert!(kpis.stats.truncated);
        assert_eq!(kpis.stats.total_fetched, 1000);
        assert_eq!(kpis.stats.page_count, 5);
        assert_eq!(kpis.total, 1000.0);
        assert_eq!(source.pages_served(), 5);
    }

    #[tokio::test]
    async fn test_sales_kpis_refetch_on_every_mount() {
        let (dashboard, source) =
            dashboard_with_sales(vec![sale(1, "2025-01-01", "north", "10", false)]);
        let filter = SalesFilter::since(jan(1));

        dashboard.sales_kpis(&filter).await.unwrap();
        dashboard.sales_kpis(&filter).await.unwrap();
        assert_eq!(source.pages_served(), 2);
    }

    #[tokio::test]
    async fn test_latest_sales_newest_first() {
        let (dashboard, _) = dashboard_with_sales(vec![
            sale(1, "2025-01-01", "north", "10", false),
            sale(3, "2025-01-03", "north", "30", false),
            sale(2, "2025-01-02", "north", "20", false),
        ]);

        let latest = dashboard
            .latest_sales(&SalesFilter::since(jan(1)), 10)
            .await
            .unwrap();
        let ids: Vec<i64> = latest.iter().map(|s| s.sale_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_latest_sales_rejects_zero_limit() {
        let (dashboard, _) = dashboard_with_sales(Vec::new());
        let result = dashboard.latest_sales(&SalesFilter::since(jan(1)), 0).await;
        assert!(matches!(result, Err(ref e) if matches!(**e, Error::InvalidLimits(_))));
    }

    #[tokio::test]
    async fn test_sales_table_scrolls_page_by_page() {
        let sales: Vec<Sale> = (1..=5)
            .rev()
            .map(|id| sale(id, "2025-01-01", "north", "1", false))
            .collect();
        let (dashboard, _) = dashboard_with_sales(sales);
        let dashboard = dashboard.with_limits(crate::config::ViewLimits {
            table_page_size: 2,
            ..Default::default()
        });

        let mut feed = dashboard.sales_table(&SalesFilter::since(jan(1)), Some("  "));
        assert!(feed.query().search.is_none());

        assert_eq!(feed.next_page().await.unwrap(), 2);
        assert_eq!(feed.next_page().await.unwrap(), 2);
        assert!(feed.has_more());
        assert_eq!(feed.next_page().await.unwrap(), 1);
        assert!(!feed.has_more());
        assert_eq!(feed.items().len(), 5);
    }
}

//! One-call aggregation of a traversal result

use crate::breakdown::{Breakdown, BreakdownSpec};
use crate::fact::Fact;
use crate::recent::recent_activity;
use crate::scalar::{ScalarKpis, scalar_kpis};
use crate::series::{SeriesPoint, daily_series};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use storepulse_core::TraversalStats;

/// What [`aggregate`] computes besides the scalar totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationOptions {
    /// Last day of the trend window, inclusive
    pub end_day: NaiveDate,
    /// Trend window length; 0 skips the series
    pub trend_days: usize,
    /// Recent-activity list length; 0 skips it
    pub recent: usize,
    pub breakdowns: Vec<BreakdownSpec>,
}

impl AggregationOptions {
    pub fn new(end_day: NaiveDate) -> Self {
        Self {
            end_day,
            trend_days: 7,
            recent: 5,
            breakdowns: Vec::new(),
        }
    }

    pub fn with_trend_days(mut self, days: usize) -> Self {
        self.trend_days = days;
        self
    }

    pub fn with_recent(mut self, k: usize) -> Self {
        self.recent = k;
        self
    }

    pub fn with_breakdown(mut self, spec: BreakdownSpec) -> Self {
        self.breakdowns.push(spec);
        self
    }
}

/// KPIs of a record set plus the completeness of the traversal behind it.
///
/// When `stats.truncated` is set every number here is a lower bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult<F> {
    pub scalars: ScalarKpis,
    pub series: Vec<SeriesPoint>,
    pub breakdowns: Vec<Breakdown>,
    pub recent: Vec<F>,
    pub stats: TraversalStats,
}

impl<F> AggregationResult<F> {
    pub fn breakdown(&self, by: crate::fact::GroupBy) -> Option<&Breakdown> {
        self.breakdowns.iter().find(|b| b.by == by)
    }
}

pub fn aggregate<F: Fact + Clone>(
    records: &[F],
    options: &AggregationOptions,
    stats: TraversalStats,
) -> AggregationResult<F> {
    AggregationResult {
        scalars: scalar_kpis(records),
        series: daily_series(records, options.end_day, options.trend_days),
        breakdowns: options
            .breakdowns
            .iter()
            .map(|spec| spec.compute(records))
            .collect(),
        recent: recent_activity(records, options.recent),
        stats,
    }
}

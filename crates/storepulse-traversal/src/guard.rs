//! Traversal bounds
//!
//! Each call site caps both the number of page requests and the number of
//! accumulated records. Hitting a cap while the server still reports more data
//! is a successful but partial outcome; the resulting stats carry
//! `truncated = true` so aggregates can be labelled as lower bounds.

use serde::{Deserialize, Serialize};
use storepulse_core::{Error, Result, StopReason};

/// Page size and caps for one traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalLimits {
    /// Records requested per page
    pub page_size: usize,
    /// Maximum page requests issued
    pub max_pages: usize,
    /// Upper bound on accumulated records; the page that crosses it is kept whole
    pub max_items: usize,
}

impl TraversalLimits {
    /// Sales KPI summaries
    pub const SALES_KPIS: Self = Self::new(200, 5, 1_000);
    /// Dashboard overview sales
    pub const DASHBOARD_SALES: Self = Self::new(500, 2, 1_000);
    /// Global inventory overview
    pub const INVENTORY: Self = Self::new(200, 50, 10_000);
    /// Product catalog KPIs
    pub const PRODUCTS: Self = Self::new(500, 20, 10_000);
    /// Branch and warehouse lists
    pub const CATALOG: Self = Self::new(200, 5, 1_000);

    pub const fn new(page_size: usize, max_pages: usize, max_items: usize) -> Self {
        Self {
            page_size,
            max_pages,
            max_items,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidLimits("page_size must be greater than 0".into()));
        }
        if self.max_pages == 0 {
            return Err(Error::InvalidLimits("max_pages must be greater than 0".into()));
        }
        if self.max_items == 0 {
            return Err(Error::InvalidLimits("max_items must be greater than 0".into()));
        }
        Ok(())
    }
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self::SALES_KPIS
    }
}

/// Outcome of [`TruncationGuard::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Continue,
    Stop(StopReason),
}

/// Counts pages and records of one traversal against its limits
#[derive(Debug, Clone)]
pub struct TruncationGuard {
    limits: TraversalLimits,
    pages: usize,
    items: usize,
}

impl TruncationGuard {
    pub fn new(limits: TraversalLimits) -> Self {
        Self {
            limits,
            pages: 0,
            items: 0,
        }
    }

    /// Account for one successfully fetched page
    pub fn record_page(&mut self, items: usize) {
        self.pages += 1;
        self.items += items;
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn items(&self) -> usize {
        self.items
    }

    /// Whether another request may be issued.
    ///
    /// `has_more` is whether the last page carried a next cursor. Exhaustion
    /// wins over the caps: a page that both reaches a cap and ends the
    /// collection is a complete traversal.
    pub fn check(&self, has_more: bool) -> GuardDecision {
        if !has_more {
            GuardDecision::Stop(StopReason::Exhausted)
        } else if self.pages >= self.limits.max_pages {
            GuardDecision::Stop(StopReason::PageLimit)
        } else if self.items >= self.limits.max_items {
            GuardDecision::Stop(StopReason::ItemLimit)
        } else {
            GuardDecision::Continue
        }
    }
}

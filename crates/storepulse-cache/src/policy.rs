//! Freshness policies
//!
//! Policies follow consumer intent: live tables always refetch, KPI
//! summaries refetch but may keep showing the previous result, catalogs stay
//! fresh for minutes.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retention applied when a policy does not name one
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(5 * 60);

/// Whether mounting a consumer refetches cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefetchOnMount {
    /// Refetch even when the cached result is fresh
    Always,
    /// Refetch only stale results
    IfStale,
    /// Serve whatever is cached; only missing or invalidated data is fetched
    Never,
}

/// What caused a consumer to ask for data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Mount,
    Focus,
    ParameterChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// How long a result is served without refetching
    pub stale_time: Duration,
    /// How long an unreferenced result survives before eviction
    pub retention_time: Duration,
    pub refetch_on_mount: RefetchOnMount,
    /// Keep showing the previous key's result while the new one loads
    pub keep_previous: bool,
}

/// Result of [`CachePolicy::decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDecision {
    /// A cached value exists and may be shown
    pub cached: bool,
    /// The cached value is within its staleness window
    pub fresh: bool,
    /// A fetch should be started
    pub refetch: bool,
}

impl CachePolicy {
    /// Transactional tables: always current
    pub const LIVE_TABLE: Self = Self {
        stale_time: Duration::ZERO,
        retention_time: DEFAULT_RETENTION,
        refetch_on_mount: RefetchOnMount::Always,
        keep_previous: false,
    };

    /// KPI summaries: refetch on every change without flicker
    pub const KPI_SUMMARY: Self = Self {
        stale_time: Duration::ZERO,
        retention_time: DEFAULT_RETENTION,
        refetch_on_mount: RefetchOnMount::IfStale,
        keep_previous: true,
    };

    pub const DASHBOARD: Self = Self {
        stale_time: Duration::from_secs(5 * 60),
        retention_time: Duration::from_secs(10 * 60),
        refetch_on_mount: RefetchOnMount::IfStale,
        keep_previous: false,
    };

    /// Branches and warehouses
    pub const CATALOG: Self = Self {
        stale_time: Duration::from_secs(10 * 60),
        retention_time: Duration::from_secs(15 * 60),
        refetch_on_mount: RefetchOnMount::IfStale,
        keep_previous: false,
    };

    pub const PRODUCTS: Self = Self {
        stale_time: Duration::from_secs(10 * 60),
        retention_time: Duration::from_secs(15 * 60),
        refetch_on_mount: RefetchOnMount::Never,
        keep_previous: false,
    };

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_retention(mut self, retention_time: Duration) -> Self {
        self.retention_time = retention_time;
        self
    }

    /// Whether a result of `age` is still fresh; a zero window is never fresh
    pub fn is_fresh(&self, age: Duration) -> bool {
        age < self.stale_time
    }

    /// Decide how to serve a request.
    ///
    /// `age` is `None` when nothing is cached. Invalidated results are always
    /// stale.
    pub fn decide(&self, age: Option<Duration>, invalidated: bool, trigger: Trigger) -> CacheDecision {
        let Some(age) = age else {
            return CacheDecision {
                cached: false,
                fresh: false,
                refetch: true,
            };
        };

        let fresh = !invalidated && self.is_fresh(age);
        let refetch = match trigger {
            Trigger::Mount => match self.refetch_on_mount {
                RefetchOnMount::Always => true,
                RefetchOnMount::IfStale => !fresh,
                RefetchOnMount::Never => invalidated,
            },
            Trigger::Focus | Trigger::ParameterChange => !fresh,
        };

        CacheDecision {
            cached: true,
            fresh,
            refetch,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            retention_time: DEFAULT_RETENTION,
            refetch_on_mount: RefetchOnMount::IfStale,
            keep_previous: false,
        }
    }
}

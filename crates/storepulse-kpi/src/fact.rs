//! Measures a record exposes to the aggregator

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use storepulse_core::types::Sale;

/// Dimensions a record can be grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Branch,
    PaymentMethod,
}

/// Ordering key for recent-activity lists: timestamp, then a unique tie-breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Recency {
    /// `None` for unparseable timestamps, which sort oldest
    pub at: Option<NaiveDateTime>,
    pub tie_breaker: i64,
}

impl Recency {
    /// Parse an ISO date or datetime without shifting it to another timezone
    pub fn parse(value: &str, tie_breaker: i64) -> Self {
        let value = value.trim();
        let at = DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.naive_local())
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
            .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").ok())
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            });
        Self { at, tie_breaker }
    }
}

/// A record the aggregator can measure
pub trait Fact {
    /// Inactive records (cancelled sales) are excluded from monetary measures
    fn is_active(&self) -> bool;

    fn amount(&self) -> f64;

    /// Calendar day the record belongs to
    fn day(&self) -> Option<NaiveDate>;

    fn recency(&self) -> Recency;

    /// Group keys and the value contributed to each. A record may feed several
    /// groups of one dimension.
    fn groups(&self, _by: GroupBy) -> Vec<(String, f64)> {
        Vec::new()
    }
}

impl Fact for Sale {
    fn is_active(&self) -> bool {
        !self.cancelled
    }

    fn amount(&self) -> f64 {
        self.total_amount()
    }

    fn day(&self) -> Option<NaiveDate> {
        Sale::day(self)
    }

    fn recency(&self) -> Recency {
        Recency::parse(&self.issued_at, self.sale_id)
    }

    fn groups(&self, by: GroupBy) -> Vec<(String, f64)> {
        match by {
            GroupBy::Branch => vec![(self.branch_id.clone(), self.total_amount())],
            GroupBy::PaymentMethod => self.payments(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recency_formats() {
        let plain = Recency::parse("2025-03-01T10:15:00", 1);
        let spaced = Recency::parse("2025-03-01 10:15:00", 1);
        let zoned = Recency::parse("2025-03-01T10:15:00-06:00", 1);
        assert_eq!(plain, spaced);
        assert_eq!(plain, zoned);

        let date_only = Recency::parse("2025-03-01", 1);
        assert!(date_only < plain);
        assert!(Recency::parse("garbage", 9) < date_only);
    }

    #[test]
    fn test_recency_tie_breaker() {
        let a = Recency::parse("2025-03-01T10:00:00", 5);
        let b = Recency::parse("2025-03-01T10:00:00", 7);
        assert!(b > a);
    }
}

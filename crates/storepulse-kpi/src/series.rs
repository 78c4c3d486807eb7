//! Per-day time series

use crate::fact::Fact;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One calendar-day bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub day: NaiveDate,
    /// Sum of active amounts on `day`
    pub value: f64,
    /// Active records on `day`
    pub count: usize,
}

impl SeriesPoint {
    /// Short `dd/mm` label for chart axes
    pub fn label(&self) -> String {
        self.day.format("%d/%m").to_string()
    }
}

/// Exactly `days` ascending buckets ending at `end_day` inclusive.
///
/// Days without activity are present with value 0. Records are bucketed by
/// their own calendar date; inactive records and records outside the window
/// are ignored.
pub fn daily_series<F: Fact>(records: &[F], end_day: NaiveDate, days: usize) -> Vec<SeriesPoint> {
    if days == 0 {
        return Vec::new();
    }

    let mut buckets: HashMap<NaiveDate, (f64, usize)> = HashMap::new();
    for record in records.iter().filter(|r| r.is_active()) {
        if let Some(day) = record.day() {
            let bucket = buckets.entry(day).or_insert((0.0, 0));
            bucket.0 += record.amount();
            bucket.1 += 1;
        }
    }

    (0..days)
        .rev()
        .filter_map(|offset| end_day.checked_sub_days(Days::new(offset as u64)))
        .map(|day| {
            let (value, count) = buckets.get(&day).copied().unwrap_or((0.0, 0));
            SeriesPoint { day, value, count }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storepulse_core::types::Sale;

    fn sale(id: i64, issued_at: &str, total: f64, cancelled: bool) -> Sale {
        Sale {
            sale_id: id,
            issued_at: issued_at.to_string(),
            branch_id: "north".to_string(),
            register_id: String::new(),
            subtotal: None,
            tax: None,
            total: Some(total.into()),
            cancelled,
            payments_summary: None,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_fifteen_day_window() {
        let series = daily_series::<Sale>(&[], day("2025-03-15"), 15);
        assert_eq!(series.len(), 15);
        assert_eq!(series[0].day, day("2025-03-01"));
        assert_eq!(series[14].day, day("2025-03-15"));
        assert!(series.windows(2).all(|w| w[0].day < w[1].day));
        assert!(series.iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn test_buckets_by_record_date_without_shift() {
        let sales = vec![
            sale(1, "2025-03-14T23:30:00", 10.0, false),
            sale(2, "2025-03-15T00:10:00-06:00", 5.0, false),
            sale(3, "2025-03-15", 7.0, false),
            sale(4, "2025-03-15", 100.0, true),
            sale(5, "2025-02-01", 1.0, false),
        ];
        let series = daily_series(&sales, day("2025-03-15"), 2);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].value, 10.0);
        assert_eq!(series[0].count, 1);
        assert_eq!(series[1].value, 12.0);
        assert_eq!(series[1].count, 2);
        assert_eq!(series[1].label(), "15/03");
    }

    #[test]
    fn test_zero_days_is_empty() {
        assert!(daily_series::<Sale>(&[], day("2025-03-15"), 0).is_empty());
    }
}

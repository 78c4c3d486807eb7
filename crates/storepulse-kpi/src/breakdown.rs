//! Group-by breakdowns with percentage shares

use crate::fact::{Fact, GroupBy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One group of a breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupShare {
    /// Raw group key (branch code, payment method code)
    pub key: String,
    /// Display name
    pub name: String,
    pub value: f64,
    /// Records contributing to the group
    pub count: usize,
    /// Share of the breakdown total, one decimal
    pub percentage: f64,
}

/// Sums value and occurrences per group key
#[derive(Debug, Clone, Default)]
pub struct GroupAccumulator {
    groups: HashMap<String, (f64, usize)>,
}

impl GroupAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: f64) {
        let group = self.groups.entry(key.into()).or_insert((0.0, 0));
        group.0 += value;
        group.1 += 1;
    }

    pub fn total(&self) -> f64 {
        self.groups.values().map(|(value, _)| value).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Resolve names and percentages, ordered by value descending then name
    pub fn finish(self, label: impl Fn(&str) -> String) -> Vec<GroupShare> {
        let total = self.total();
        let mut shares: Vec<GroupShare> = self
            .groups
            .into_iter()
            .map(|(key, (value, count))| {
                let name = label(&key);
                let name = if name.trim().is_empty() {
                    key.clone()
                } else {
                    name.trim().to_string()
                };
                GroupShare {
                    percentage: percentage(value, total),
                    key,
                    name,
                    value,
                    count,
                }
            })
            .collect();

        shares.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.key.cmp(&b.key))
        });
        shares
    }
}

/// `100 * value / total` rounded to one decimal; 0.0 when total is 0
fn percentage(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    (value / total * 1000.0).round() / 10.0
}

/// Display name for a payment method code.
///
/// Known short and long codes map to fixed names; anything else is shown
/// capitalised.
pub fn payment_label(code: &str) -> String {
    let code = code.trim().to_lowercase();
    let known = match code.as_str() {
        "cash" | "csh" | "efe" => Some("Cash"),
        "cre" | "credit" => Some("Credit"),
        "deb" | "debit" => Some("Debit"),
        "trf" | "tra" | "transfer" => Some("Transfer"),
        "card" | "tar" => Some("Card"),
        _ => None,
    };
    match known {
        Some(name) => name.to_string(),
        None => {
            let mut chars = code.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// A breakdown to compute, with optional display names per key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownSpec {
    pub by: GroupBy,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl BreakdownSpec {
    pub fn new(by: GroupBy) -> Self {
        Self {
            by,
            labels: HashMap::new(),
        }
    }

    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    fn label(&self, key: &str) -> String {
        match self.labels.get(key).filter(|name| !name.trim().is_empty()) {
            Some(name) => name.clone(),
            None => match self.by {
                GroupBy::Branch => key.to_string(),
                GroupBy::PaymentMethod => payment_label(key),
            },
        }
    }

    /// Run this breakdown over the active records
    pub fn compute<F: Fact>(&self, records: &[F]) -> Breakdown {
        let mut acc = GroupAccumulator::new();
        for record in records.iter().filter(|r| r.is_active()) {
            for (key, value) in record.groups(self.by) {
                acc.add(key, value);
            }
        }
        Breakdown {
            by: self.by,
            groups: acc.finish(|key| self.label(key)),
        }
    }
}

/// Computed breakdown for one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub by: GroupBy,
    pub groups: Vec<GroupShare>,
}

//! Scalar totals

use crate::fact::Fact;
use serde::{Deserialize, Serialize};

/// Headline numbers over a record set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScalarKpis {
    /// Sum of amounts over active records
    pub total: f64,
    pub active_count: usize,
    /// Cancelled or otherwise inactive records
    pub inactive_count: usize,
    /// `total / active_count`, 0 with no active records
    pub average: f64,
}

pub fn scalar_kpis<F: Fact>(records: &[F]) -> ScalarKpis {
    let mut kpis = ScalarKpis::default();
    for record in records {
        if record.is_active() {
            kpis.total += record.amount();
            kpis.active_count += 1;
        } else {
            kpis.inactive_count += 1;
        }
    }
    kpis.average = if kpis.active_count > 0 {
        kpis.total / kpis.active_count as f64
    } else {
        0.0
    };
    kpis
}

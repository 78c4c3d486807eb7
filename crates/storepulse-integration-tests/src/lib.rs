//! End-to-end integration tests for StorePulse
//!
//! The tests under `tests/` drive the dashboard views against a mocked
//! collection API. This library holds the shared page and record fixtures.

use serde_json::{Value, json};
use std::sync::Arc;
use storepulse_cache::QueryStore;
use storepulse_core::EventSink;
use storepulse_dashboard::{Dashboard, DashboardConfig};
use storepulse_egress::{ApiConfig, HttpClientConfig, NoopSessionListener, SessionListener};

/// Wire JSON for one sale
pub fn sale_json(id: i64, issued_at: &str, branch: &str, total: &str, cancelled: bool) -> Value {
    json!({
        "sale_id": id,
        "issued_at": issued_at,
        "branch_id": branch,
        "register_id": "r1",
        "total": total,
        "cancelled": cancelled,
        "payments_summary": format!("CASH:{}", total)
    })
}

/// Wire JSON for a page; `next` is `(primary, secondary)`
pub fn page_json(items: Vec<Value>, next: Option<(&str, i64)>) -> Value {
    json!({
        "items": items,
        "next_cursor": next.map(|(primary, secondary)| json!({
            "primary": primary,
            "secondary": secondary
        }))
    })
}

/// `count` active sales of 1.00 each, ids descending from `first_id`
pub fn uniform_sales(first_id: i64, count: i64, issued_at: &str) -> Vec<Value> {
    (0..count)
        .map(|offset| sale_json(first_id - offset, issued_at, "north", "1.00", false))
        .collect()
}

/// Configuration pointing at a mock server, with fast retries
pub fn test_config(base_url: &str) -> DashboardConfig {
    DashboardConfig {
        api: ApiConfig::new(base_url).with_token("test-token"),
        http: HttpClientConfig {
            page_timeout_ms: 2_000,
            retry_base_delay_ms: 1,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Dashboard over HTTP with its own store
pub fn http_dashboard(base_url: &str) -> Dashboard {
    http_dashboard_with(base_url, None, Arc::new(NoopSessionListener))
}

pub fn http_dashboard_with(
    base_url: &str,
    sink: Option<Arc<dyn EventSink>>,
    session: Arc<dyn SessionListener>,
) -> Dashboard {
    let store = match sink.clone() {
        Some(sink) => QueryStore::with_sink(sink),
        None => QueryStore::new(),
    };
    let dashboard = Dashboard::from_config(&test_config(base_url), store, session)
        .expect("test dashboard");
    match sink {
        Some(sink) => dashboard.with_sink(sink),
        None => dashboard,
    }
}

//! StorePulse Observability
//!
//! This crate provides observability features:
//! - Structured logging setup
//! - Prometheus counters fed from traversal and cache events

pub mod logging;
pub mod metrics;

pub use logging::{LoggingConfig, init_logging};
pub use metrics::{Metrics, MetricsSink};

//! StorePulse Egress
//!
//! This crate talks to the dashboard REST API:
//! - Shared HTTP client construction and bounded retry
//! - The cursor-paginated collection client
//! - Session-expiry signalling on 401 responses

pub mod client;
pub mod collection;
pub mod session;

pub use client::{HttpClientConfig, create_client, with_retry};
pub use collection::{ApiConfig, HttpCollection};
pub use session::{NoopSessionListener, SessionListener, SessionSignal};

//! Shared HTTP client utilities

use rand::Rng;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use storepulse_core::{Error, Result};
use tracing::{debug, warn};

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Timeout applied to each individual page request, in milliseconds
    pub page_timeout_ms: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Retries after the first attempt for transient errors
    pub max_retries: u32,

    /// First backoff delay; doubles on every further attempt
    pub retry_base_delay_ms: u64,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            page_timeout_ms: 15_000,
            connect_timeout_secs: 5,
            pool_max_idle_per_host: 8,
            max_retries: 2,
            retry_base_delay_ms: 250,
            user_agent: format!("StorePulse/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Create a configured HTTP client with connection pooling
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        // Expire idle connections before the API's load balancer drops them
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Backoff before retry `attempt` (1-based): base * 2^(attempt-1) plus up to 50% jitter
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    let jitter_cap = (exp.as_millis() as u64) / 2;
    let jitter = if jitter_cap > 0 {
        rand::rng().random_range(0..=jitter_cap)
    } else {
        0
    };
    exp + Duration::from_millis(jitter)
}

/// Retry policy for transient errors.
///
/// Only errors reporting [`Error::is_retryable`] are retried; 401s, invalid
/// cursors and malformed pages fail on the first attempt.
pub async fn with_retry<F, Fut, T>(max_retries: u32, base_delay: Duration, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                let delay = backoff_delay(base_delay, attempt);
                warn!(
                    attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "page request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt > 0 {
                    debug!(attempts = attempt + 1, error = %e, "giving up after retries");
                }
                return Err(e);
            }
        }
    }
}

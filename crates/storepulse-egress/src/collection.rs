//! Cursor-paginated collection client
//!
//! `GET <base><collection>?<filters>&limit=<n>&cursor_primary=<p>&cursor_secondary=<s>`
//! answered by `{ "items": [...], "next_cursor": { "primary", "secondary" } | null }`.

use crate::client::{HttpClientConfig, create_client, with_retry};
use crate::session::{NoopSessionListener, SessionListener};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storepulse_core::{
    CollectionQuery, CollectionSource, CompositeCursor, Error, Page, PageRequest, Record, Result,
};
use tracing::{debug, instrument, warn};

/// Error codes the API uses for cursors it will never accept again
const CURSOR_ERROR_CODES: &[&str] = &["invalid_cursor", "cursor_expired"];

/// API endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token; `None` sends unauthenticated requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            token: None,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Wire shape of a page before item validation
#[derive(Debug, Deserialize)]
struct RawPage {
    items: Vec<serde_json::Value>,
    #[serde(default)]
    next_cursor: Option<CompositeCursor>,
}

/// Wire shape of an error body
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP implementation of [`CollectionSource`] for every record type
pub struct HttpCollection {
    api: ApiConfig,
    client_config: HttpClientConfig,
    client: Client,
    session: Arc<dyn SessionListener>,
}

impl HttpCollection {
    pub fn new(api: ApiConfig, client_config: HttpClientConfig) -> Result<Self> {
        let client = create_client(&client_config)?;
        Ok(Self {
            api,
            client_config,
            client,
            session: Arc::new(NoopSessionListener),
        })
    }

    /// Listener notified when the API answers 401
    pub fn with_session_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.session = listener;
        self
    }

    /// Full request URL for one page
    pub fn page_url(&self, query: &CollectionQuery, request: &PageRequest) -> Result<Url> {
        let mut params = query.to_params();
        params.push(("limit", request.limit.to_string()));
        if let Some(ref cursor) = request.cursor {
            params.push(("cursor_primary", cursor.primary.clone()));
            params.push(("cursor_secondary", cursor.secondary.to_string()));
        }

        let base = format!("{}{}", self.api.base_url.trim_end_matches('/'), query.collection);
        Url::parse_with_params(&base, &params)
            .map_err(|e| Error::Config(format!("Invalid collection URL '{}': {}", base, e)))
    }

    async fn send_once<R: Record>(&self, url: &Url) -> Result<Page<R>> {
        let mut builder = self
            .client
            .get(url.clone())
            .timeout(self.client_config.page_timeout());
        if let Some(ref token) = self.api.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        debug!(status = status.as_u16(), bytes = body.len(), "collection response");

        if status.as_u16() == 401 {
            self.session.session_expired();
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body));
        }

        parse_page::<R>(&body)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout(self.client_config.page_timeout_ms)
        } else {
            Error::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl<R: Record> CollectionSource<R> for HttpCollection {
    #[instrument(skip(self, query), fields(collection = %query.collection, limit = request.limit))]
    async fn fetch_page(&self, query: &CollectionQuery, request: &PageRequest) -> Result<Page<R>> {
        let url = self.page_url(query, request)?;
        let url = &url;
        with_retry(
            self.client_config.max_retries,
            self.client_config.retry_base_delay(),
            || async move { self.send_once::<R>(url).await },
        )
        .await
    }
}

/// Map a non-success, non-401 status to the error taxonomy
fn classify_failure(status: u16, body: &str) -> Error {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let cursor_fault = matches!(status, 400 | 409 | 410 | 422)
        && parsed
            .code
            .as_deref()
            .or(parsed.error.as_deref())
            .is_some_and(|code| CURSOR_ERROR_CODES.contains(&code));
    if cursor_fault {
        return Error::InvalidCursor(
            parsed
                .message
                .or(parsed.code)
                .unwrap_or_else(|| format!("HTTP {}", status)),
        );
    }

    let message = parsed
        .error
        .or(parsed.message)
        .unwrap_or_else(|| format!("HTTP {}", status));
    Error::Http { status, message }
}

/// Validate a page body, rejecting individual malformed items
fn parse_page<R: Record>(body: &str) -> Result<Page<R>> {
    let raw: RawPage = serde_json::from_str(body)
        .map_err(|e| Error::MalformedPage(format!("unparseable page body: {}", e)))?;

    let mut items = Vec::with_capacity(raw.items.len());
    let mut rejected = 0usize;
    for value in raw.items {
        let record = serde_json::from_value::<R>(value)
            .map_err(|e| e.to_string())
            .and_then(|record| record.validate().map(|_| record));
        match record {
            Ok(record) => items.push(record),
            Err(reason) => {
                rejected += 1;
                warn!(collection = R::COLLECTION, reason = %reason, "rejected malformed record");
            }
        }
    }

    Ok(Page {
        items,
        next_cursor: raw.next_cursor,
        rejected,
    })
}

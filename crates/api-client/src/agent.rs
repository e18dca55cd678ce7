//! Transport seam between the resource layer and ESI
//!
//! Everything above this module talks to an [`Agent`]. [`HttpAgent`] is the
//! `reqwest` implementation; tests substitute their own.

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::operation::{Request, Response};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

/// Page count header on paginated operations
const X_PAGES: &str = "X-Pages";

/// Executes ESI operations
#[async_trait]
pub trait Agent: Send + Sync {
    /// Perform one request and return its parsed body
    async fn request(&self, request: Request) -> ApiResult<Response>;
}

/// `reqwest`-backed [`Agent`]
#[derive(Debug, Clone)]
pub struct HttpAgent {
    inner: Client,
    base_url: String,
    datasource: &'static str,
    language: Option<String>,
}

impl HttpAgent {
    /// Build an agent from a validated configuration
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| ApiError::config("User-Agent contains invalid header characters"))?;
        default_headers.insert(USER_AGENT, user_agent);

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        Ok(Self {
            inner,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            datasource: config.datasource.as_str(),
            language: config.language.clone(),
        })
    }

    /// Base URL requests are resolved against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &Request) -> ApiResult<String> {
        let path = request.render_path()?;
        let url = format!("{}{}", self.base_url, path);
        reqwest::Url::parse(&url).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(url)
    }
}

#[async_trait]
impl Agent for HttpAgent {
    #[instrument(
        skip(self, request),
        fields(operation = request.operation().id, request_id)
    )]
    async fn request(&self, request: Request) -> ApiResult<Response> {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let operation = request.operation();
        let url = self.url_for(&request)?;

        let mut builder = self
            .inner
            .request(operation.method.into(), &url)
            .header(X_REQUEST_ID, &request_id)
            .query(&[("datasource", self.datasource)]);

        if let Some(ref language) = self.language {
            builder = builder.query(&[("language", language.as_str())]);
        }
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(token) = request.access_token() {
            builder = builder.bearer_auth(token.secret());
        }
        if let Some(body) = request.json_body() {
            builder = builder.json(body);
        }

        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let pages = parse_pages(response.headers());

        debug!(
            method = operation.method.as_str(),
            url = %url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis(),
            "ESI request completed"
        );

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::api_response(status.as_u16(), error_message(&text)));
        }

        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok(Response { body, pages })
    }
}

fn parse_pages(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(X_PAGES)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// ESI wraps failures as `{"error": "..."}`; fall back to the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| {
            if body.is_empty() {
                "Unknown error".to_string()
            } else {
                body.to_string()
            }
        })
}

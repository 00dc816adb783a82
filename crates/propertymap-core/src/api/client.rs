//! API client for the CRM's paginated property listing endpoint.
//!
//! The endpoint accepts `maxSize`, `offset`, `orderBy` and `order` query
//! parameters and answers with `{ "list": [...], "total": n }`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Listing endpoint of the reference CRM deployment
pub const DEFAULT_BASE_URL: &str = "https://pf.wspp.co.uk/api/v1/CUnits";

/// Records requested per page
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the CRM API key
const API_KEY_HEADER: &str = "X-Api-Key";

/// Pages are ordered by name so offsets stay stable between requests.
const ORDER_BY: &str = "name";
const ORDER: &str = "asc";

/// One page of raw listing records as returned by the CRM.
///
/// Records are kept as untyped JSON; decoding and normalization happen in
/// [`crate::models::Property::from_raw`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub list: Vec<Value>,
    pub total: u64,
}

impl ListingPage {
    /// Build a page from the CRM's response body.
    ///
    /// A missing or non-array `list` is an empty page and a missing or
    /// non-numeric `total` counts as zero.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut body) = value else {
            return Self::default();
        };

        let list = match body.remove("list") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let total = match body.get("total") {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };

        Self { list, total }
    }
}

/// A paginated source of raw listing records.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch up to `max_size` records starting at `offset`, ordered by name.
    async fn fetch_page(&self, offset: usize, max_size: usize) -> Result<ListingPage>;
}

#[derive(Debug, Clone)]
pub struct CrmClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for CrmClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// API client for the CRM.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct CrmClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CrmClient {
    pub fn new(config: CrmClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build CRM HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key.filter(|k| !k.is_empty()),
        })
    }

    fn headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(ref key) = self.api_key {
            headers.insert(
                API_KEY_HEADER,
                header::HeaderValue::from_str(key).context("API key is not a valid header value")?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }
}

#[async_trait]
impl ListingSource for CrmClient {
    async fn fetch_page(&self, offset: usize, max_size: usize) -> Result<ListingPage> {
        debug!(offset, max_size, "Requesting listing page");

        let response = self
            .client
            .get(&self.base_url)
            .headers(self.headers()?)
            .query(&[
                ("maxSize", max_size.to_string()),
                ("offset", offset.to_string()),
                ("orderBy", ORDER_BY.to_string()),
                ("order", ORDER.to_string()),
            ])
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send listing request at offset {}", offset))?;

        let response = Self::check_response(response).await?;

        let text = response
            .text()
            .await
            .context("Failed to read listing response body")?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .context("Failed to parse listing response")?;

        Ok(ListingPage::from_value(body))
    }
}

use serde_json::{json, Value};
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};
use tracing::debug;

use super::{classify_request_error, ListingsError, ListingsSource};

pub const DEFAULT_HOST: &str = "realty-in-us.p.rapidapi.com";

/// Listings search client for the RapidAPI realty service.
///
/// The request timeout is enforced on the HTTP client; a timed-out search
/// surfaces as `ListingsError::Timeout`. Transient failures (transport
/// errors, 5xx) are retried with bounded exponential backoff; auth failures
/// and timeouts are not.
pub struct RapidApiListings {
    http: reqwest::Client,
    api_key: String,
    host: String,
}

impl RapidApiListings {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, ListingsError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("house-scout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(ListingsError::Transport)?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            host: DEFAULT_HOST.to_string(),
        })
    }

    /// Point the client at a different host (used by tests and self-hosted
    /// proxies).
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    async fn search_once(
        &self,
        zip: &str,
        statuses: &[&str],
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, ListingsError> {
        let url = format!("https://{}/properties/v3/list", self.host);
        let body = json!({
            "limit": limit,
            "offset": offset,
            "postal_code": zip,
            "status": statuses,
            "sort": { "direction": "desc", "field": "list_date" }
        });

        let response = self
            .http
            .post(&url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ListingsError::Auth);
        }
        if !status.is_success() {
            return Err(ListingsError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await.map_err(classify_request_error)?;
        parse_search_results(&payload)
    }
}

/// Accepted response shapes: `data.home_search.results` (v3) or a top-level
/// `properties` array (older deployments). A present-but-null results field
/// means zero records, not a malformed payload.
pub(crate) fn parse_search_results(payload: &Value) -> Result<Vec<Value>, ListingsError> {
    if let Some(home_search) = payload.pointer("/data/home_search") {
        return Ok(home_search
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default());
    }
    if let Some(properties) = payload.get("properties") {
        return Ok(properties.as_array().cloned().unwrap_or_default());
    }
    Err(ListingsError::Payload(
        "unrecognized search response shape".to_string(),
    ))
}

impl ListingsSource for RapidApiListings {
    async fn search_by_zip(
        &self,
        zip: &str,
        statuses: &[&str],
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Value>, ListingsError> {
        let strategy = ExponentialBackoff::from_millis(200)
            .max_delay(Duration::from_secs(5))
            .take(3);

        let results = RetryIf::start(
            strategy,
            || self.search_once(zip, statuses, limit, offset),
            ListingsError::is_transient,
        )
        .await?;

        debug!(zip, count = results.len(), "listings search completed");
        Ok(results)
    }
}

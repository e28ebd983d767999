use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{classify_request_error, ListingsError, ZipResolver};

pub const DEFAULT_BASE_URL: &str = "https://api.zippopotam.us";

/// City+state to ZIP resolution via the Zippopotam place API.
pub struct ZippopotamResolver {
    http: reqwest::Client,
    base_url: String,
}

impl ZippopotamResolver {
    pub fn new(timeout: Duration) -> Result<Self, ListingsError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("house-scout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(ListingsError::Transport)?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Pull the ZIP list out of a Zippopotam place response:
/// `{ "places": [ { "post code": "62704", ... }, ... ] }`.
pub(crate) fn parse_place_zips(payload: &Value) -> Vec<String> {
    payload
        .get("places")
        .and_then(Value::as_array)
        .map(|places| {
            places
                .iter()
                .filter_map(|place| place.get("post code").and_then(Value::as_str))
                .map(|zip| zip.to_string())
                .collect()
        })
        .unwrap_or_default()
}

impl ZipResolver for ZippopotamResolver {
    async fn resolve(&self, city: &str, state: &str) -> Result<Vec<String>, ListingsError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ListingsError::Payload(format!("bad geocoder base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ListingsError::Payload("bad geocoder base url".to_string()))?
            .extend(["us", &state.to_lowercase(), city]);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        // Zippopotam answers 404 for places it has never heard of; that is
        // the "no such place" case, not a failure.
        if status.as_u16() == 404 {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(ListingsError::Status(status.as_u16()));
        }

        let payload: Value = response.json().await.map_err(classify_request_error)?;
        let zips = parse_place_zips(&payload);
        debug!(city, state, count = zips.len(), "resolved city to ZIP codes");
        Ok(zips)
    }
}

pub mod client;
pub mod geocode;

pub use client::RapidApiListings;
pub use geocode::ZippopotamResolver;

use serde_json::Value;
use thiserror::Error;

/// Upstream failure conditions, kept distinct so callers can react to each.
/// Auth failures and timeouts are never retried.
#[derive(Debug, Error)]
pub enum ListingsError {
    #[error("upstream authentication failed; check the configured API key")]
    Auth,
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("malformed upstream payload: {0}")]
    Payload(String),
}

impl ListingsError {
    /// Transient errors are worth one more try; auth failures, timeouts,
    /// and client-side HTTP errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ListingsError::Transport(_) => true,
            ListingsError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

/// Classify a reqwest failure: timeouts get their own condition.
pub(crate) fn classify_request_error(err: reqwest::Error) -> ListingsError {
    if err.is_timeout() {
        ListingsError::Timeout
    } else {
        ListingsError::Transport(err)
    }
}

/// Search-by-ZIP collaborator returning heterogeneous property records.
pub trait ListingsSource {
    fn search_by_zip(
        &self,
        zip: &str,
        statuses: &[&str],
        limit: u32,
        offset: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Value>, ListingsError>> + Send;
}

/// City+state to ZIP-code-list collaborator. An empty list is a valid
/// "no such place" answer, not an error.
pub trait ZipResolver {
    fn resolve(
        &self,
        city: &str,
        state: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, ListingsError>> + Send;
}

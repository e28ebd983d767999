use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// RapidAPI key for the listings service. Also settable via the
    /// HOUSE_SCOUT_RAPIDAPI_KEY environment variable, which wins over the
    /// file.
    pub rapidapi_key: Option<String>,
    /// Per-request timeout for upstream HTTP calls, in seconds.
    pub request_timeout_secs: u64,
    /// Cached rows older than this many days are ignored by reads.
    pub freshness_days: i64,
    /// Default window for `purge` when no --days is given.
    pub purge_days: i64,
    /// Where the SQLite databases live. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rapidapi_key: None,
            request_timeout_secs: 15,
            freshness_days: crate::cache::READ_FRESHNESS_DAYS,
            purge_days: crate::cache::DEFAULT_PURGE_DAYS,
            data_dir: None,
        }
    }
}

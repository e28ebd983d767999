use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cached listing, keyed by (zip_code, address).
///
/// `address` is the upstream address line, lower-cased and trimmed; the
/// street-only normalization is applied on top of it at match time. The raw
/// upstream payload is kept verbatim for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedProperty {
    pub zip_code: String,
    pub address: String,
    pub bedrooms: i64,
    /// Half-baths count as 0.5.
    pub bathrooms: f64,
    pub sqft: i64,
    pub lot_sqft: i64,
    /// lot_sqft / 43560, rounded to 2 decimals.
    pub lot_acres: f64,
    pub garage_cars: i64,
    pub year_built: Option<i64>,
    pub property_type: String,
    pub price: Option<i64>,
    pub photo_url: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub raw: serde_json::Value,
}

impl CachedProperty {
    /// Age of the cache entry relative to `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_days()
    }
}

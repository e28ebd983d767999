use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use super::extract::extract_property;
use super::store::{PropertyStore, StoreError};
use super::types::CachedProperty;
use crate::address;
use crate::listings::{ListingsError, ListingsSource, ZipResolver};

/// Maximum age of a cached row still served by lookups and searches.
pub const READ_FRESHNESS_DAYS: i64 = 360;
/// Default window for the age-based purge. Deliberately different from the
/// read freshness window; the two are independent knobs.
pub const DEFAULT_PURGE_DAYS: i64 = 90;

/// Broad status filter for point lookups: the address may belong to a
/// listing in any state.
pub const BROAD_STATUSES: &[&str] = &[
    "for_sale",
    "ready_to_build",
    "for_rent",
    "sold",
    "off_market",
    "other",
];
/// Active-listing statuses for price-bounded searches.
pub const ACTIVE_STATUSES: &[&str] = &["for_sale", "ready_to_build"];

const SEARCH_LIMIT: u32 = 200;
const SAMPLE_ADDRESSES: usize = 3;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no properties found in ZIP {0}")]
    NoPropertiesInZip(String),
    #[error("unknown city: {city}, {state}")]
    UnknownCity { city: String, state: String },
    #[error(transparent)]
    Upstream(#[from] ListingsError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a point lookup.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    Found(CachedProperty),
    /// No match; carries up to 3 addresses actually present in the ZIP so
    /// the caller can tell the user what *was* found there.
    NotFound { samples: Vec<String> },
}

/// Result of a city-wide search, with cache accounting per ZIP.
#[derive(Debug, Clone)]
pub struct CitySearch {
    pub properties: Vec<CachedProperty>,
    pub zips_searched: Vec<String>,
    pub cache_hit_zips: Vec<String>,
    pub api_zips: Vec<String>,
    /// ZIPs whose upstream search failed transiently and was skipped, as
    /// opposed to ZIPs that genuinely had nothing to contribute.
    pub failed_zips: Vec<String>,
}

/// The address-matching cache layer over an injected `PropertyStore`.
pub struct PropertyCache<S> {
    store: S,
    freshness_days: i64,
}

impl<S: PropertyStore> PropertyCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_freshness_days(store, READ_FRESHNESS_DAYS)
    }

    pub fn with_freshness_days(store: S, freshness_days: i64) -> Self {
        Self {
            store,
            freshness_days,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Find a single property by address within a ZIP.
    ///
    /// Cache-first: fresh rows for the ZIP are matched against the
    /// normalized query. On a miss the external search is consulted once
    /// (broad status filter), its results cached, and the match retried
    /// over the freshly cached rows.
    pub async fn lookup<L: ListingsSource>(
        &self,
        listings: &L,
        raw_address: &str,
        zip: &str,
    ) -> Result<LookupOutcome, SearchError> {
        let key = address::normalize(raw_address);

        let cached = self.store.fresh_by_zip(zip, self.freshness_days)?;
        if let Some(found) = match_address(&key, &cached) {
            debug!(zip, %key, "lookup served from cache");
            return Ok(LookupOutcome::Found(found));
        }

        debug!(zip, %key, "cache miss, querying listings search");
        let records = listings
            .search_by_zip(zip, BROAD_STATUSES, SEARCH_LIMIT, 0)
            .await?;
        if records.is_empty() {
            return Err(SearchError::NoPropertiesInZip(zip.to_string()));
        }
        self.cache_records(zip, &records)?;

        let cached = self.store.fresh_by_zip(zip, self.freshness_days)?;
        if let Some(found) = match_address(&key, &cached) {
            return Ok(LookupOutcome::Found(found));
        }
        Ok(LookupOutcome::NotFound {
            samples: cached
                .iter()
                .take(SAMPLE_ADDRESSES)
                .map(|p| p.address.clone())
                .collect(),
        })
    }

    /// All properties in a ZIP priced at or under `max_price`, ascending.
    ///
    /// Cache-first per ZIP; on a miss the external search is restricted to
    /// active listings. A ZIP the upstream knows nothing about surfaces as
    /// `NoPropertiesInZip`; a ZIP with listings but none under the ceiling
    /// yields an empty list.
    pub async fn search_by_price_ceiling<L: ListingsSource>(
        &self,
        listings: &L,
        zip: &str,
        max_price: i64,
    ) -> Result<Vec<CachedProperty>, SearchError> {
        let cached = self
            .store
            .fresh_under_price(zip, max_price, self.freshness_days)?;
        if !cached.is_empty() {
            debug!(zip, count = cached.len(), "price search served from cache");
            return Ok(cached);
        }

        let records = listings
            .search_by_zip(zip, ACTIVE_STATUSES, SEARCH_LIMIT, 0)
            .await?;
        if records.is_empty() {
            return Err(SearchError::NoPropertiesInZip(zip.to_string()));
        }
        self.cache_records(zip, &records)?;

        Ok(self
            .store
            .fresh_under_price(zip, max_price, self.freshness_days)?)
    }

    /// City-wide price-bounded search: resolve the city to ZIPs, run the
    /// per-ZIP search sequentially (cache-first per ZIP), merge, dedupe by
    /// address, and sort ascending by price.
    pub async fn search_by_city<L, G>(
        &self,
        listings: &L,
        resolver: &G,
        city: &str,
        state: &str,
        max_price: i64,
    ) -> Result<CitySearch, SearchError>
    where
        L: ListingsSource,
        G: ZipResolver,
    {
        let zips = resolver.resolve(city, state).await?;
        if zips.is_empty() {
            return Err(SearchError::UnknownCity {
                city: city.to_string(),
                state: state.to_string(),
            });
        }

        let mut properties = Vec::new();
        let mut cache_hit_zips = Vec::new();
        let mut api_zips = Vec::new();
        let mut failed_zips = Vec::new();

        for zip in &zips {
            let cached = self
                .store
                .fresh_under_price(zip, max_price, self.freshness_days)?;
            if !cached.is_empty() {
                cache_hit_zips.push(zip.clone());
                properties.extend(cached);
                continue;
            }

            api_zips.push(zip.clone());
            match self.search_by_price_ceiling(listings, zip, max_price).await {
                Ok(found) => properties.extend(found),
                // An empty ZIP contributes nothing to a city-wide merge.
                Err(SearchError::NoPropertiesInZip(_)) => {}
                Err(SearchError::Upstream(e)) if e.is_transient() => {
                    warn!(zip, error = %e, "skipping ZIP after upstream failure");
                    failed_zips.push(zip.clone());
                }
                Err(e) => return Err(e),
            }
        }

        // Same house can straddle ZIP resolution results; dedupe on the
        // exact stored address string.
        let mut seen = HashSet::new();
        properties.retain(|p| seen.insert(p.address.clone()));
        properties.sort_by_key(|p| p.price.unwrap_or(i64::MAX));

        Ok(CitySearch {
            properties,
            zips_searched: zips,
            cache_hit_zips,
            api_zips,
            failed_zips,
        })
    }

    /// Hard-delete cache rows older than `days`. Returns the count deleted.
    pub fn purge_older_than(&self, days: i64) -> Result<usize, SearchError> {
        let deleted = self.store.purge_older_than(days)?;
        debug!(days, deleted, "purged stale cache rows");
        Ok(deleted)
    }

    /// Upsert every extractable record; malformed records are skipped and
    /// counted rather than aborting the pass.
    fn cache_records(&self, zip: &str, records: &[Value]) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut cached = 0usize;
        let mut skipped = 0usize;

        for record in records {
            let Some(prop) = extract_property(record, zip, now) else {
                skipped += 1;
                warn!(zip, "skipping listing record with no usable address");
                continue;
            };
            match self.store.upsert(&prop) {
                Ok(()) => cached += 1,
                Err(e) => {
                    skipped += 1;
                    warn!(zip, address = %prop.address, error = %e, "failed to cache listing record");
                }
            }
        }

        debug!(zip, cached, skipped, "cached listings for ZIP");
        Ok(cached)
    }
}

/// Bidirectional substring containment over normalized street keys.
/// Candidates arrive newest first; the first match wins. Degenerate (empty)
/// keys never match.
fn match_address(key: &str, candidates: &[CachedProperty]) -> Option<CachedProperty> {
    if key.is_empty() {
        return None;
    }
    for candidate in candidates {
        let cand = address::normalize(&candidate.address);
        if cand.is_empty() {
            continue;
        }
        if cand.contains(key) || key.contains(&cand) {
            return Some(candidate.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::SqliteStore;
    use serde_json::json;
    use std::sync::Mutex;

    /// Canned listings source that counts how often it is hit.
    struct MockListings {
        records: Vec<Value>,
        calls: Mutex<usize>,
    }

    impl MockListings {
        fn new(records: Vec<Value>) -> Self {
            Self {
                records,
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl ListingsSource for MockListings {
        async fn search_by_zip(
            &self,
            _zip: &str,
            _statuses: &[&str],
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<Value>, ListingsError> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.records.clone())
        }
    }

    /// Serves canned records, except for one ZIP that always answers 503.
    struct FlakyListings {
        bad_zip: String,
        records: Vec<Value>,
    }

    impl ListingsSource for FlakyListings {
        async fn search_by_zip(
            &self,
            zip: &str,
            _statuses: &[&str],
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<Value>, ListingsError> {
            if zip == self.bad_zip {
                return Err(ListingsError::Status(503));
            }
            Ok(self.records.clone())
        }
    }

    struct FailingListings;

    impl ListingsSource for FailingListings {
        async fn search_by_zip(
            &self,
            _zip: &str,
            _statuses: &[&str],
            _limit: u32,
            _offset: u32,
        ) -> Result<Vec<Value>, ListingsError> {
            Err(ListingsError::Auth)
        }
    }

    struct MockResolver {
        zips: Vec<String>,
    }

    impl ZipResolver for MockResolver {
        async fn resolve(&self, _city: &str, _state: &str) -> Result<Vec<String>, ListingsError> {
            Ok(self.zips.clone())
        }
    }

    fn record(line: &str, price: i64) -> Value {
        json!({
            "location": { "address": { "line": line } },
            "list_price": price,
            "description": { "beds": 3, "baths_full": 2, "sqft": 1800 }
        })
    }

    fn cache() -> PropertyCache<SqliteStore> {
        PropertyCache::new(SqliteStore::in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_lookup_served_from_cache_without_api_call() {
        let cache = cache();
        let listings = MockListings::new(vec![record("123 Main St", 250_000)]);

        // Prime the cache through one miss.
        let outcome = cache
            .lookup(&listings, "123 Main St, Springfield, IL 62704", "62704")
            .await
            .unwrap();
        assert!(matches!(outcome, LookupOutcome::Found(_)));
        assert_eq!(listings.calls(), 1);

        // Second lookup hits the cache only.
        let outcome = cache
            .lookup(&listings, "123 Main St, Springfield, IL 62704", "62704")
            .await
            .unwrap();
        assert!(matches!(outcome, LookupOutcome::Found(_)));
        assert_eq!(listings.calls(), 1);
    }

    #[tokio::test]
    async fn test_lookup_matches_despite_unit_suffix() {
        let cache = cache();
        let listings = MockListings::new(vec![record("123 Main St Unit 4B", 250_000)]);

        let outcome = cache
            .lookup(&listings, "123 Main St, Springfield, IL 62704", "62704")
            .await
            .unwrap();
        let LookupOutcome::Found(prop) = outcome else {
            panic!("expected a match");
        };
        assert_eq!(prop.address, "123 main st unit 4b");
    }

    #[tokio::test]
    async fn test_lookup_not_found_carries_samples() {
        let cache = cache();
        let listings = MockListings::new(vec![
            record("1 First St", 100_000),
            record("2 Second St", 200_000),
            record("3 Third St", 300_000),
            record("4 Fourth St", 400_000),
        ]);

        let outcome = cache
            .lookup(&listings, "999 Nowhere Ln, Springfield, IL 62704", "62704")
            .await
            .unwrap();
        let LookupOutcome::NotFound { samples } = outcome else {
            panic!("expected not-found");
        };
        assert_eq!(samples.len(), 3);
    }

    #[tokio::test]
    async fn test_lookup_empty_zip_is_distinct_condition() {
        let cache = cache();
        let listings = MockListings::new(vec![]);

        let err = cache
            .lookup(&listings, "123 Main St, Springfield, IL 62704", "62704")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NoPropertiesInZip(zip) if zip == "62704"));
    }

    #[tokio::test]
    async fn test_lookup_degenerate_address_never_matches() {
        let cache = cache();
        let listings = MockListings::new(vec![record("123 Main St", 250_000)]);

        let outcome = cache.lookup(&listings, "62704", "62704").await.unwrap();
        assert!(matches!(outcome, LookupOutcome::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_lookup_surfaces_auth_error() {
        let cache = cache();
        let err = cache
            .lookup(&FailingListings, "123 Main St 62704", "62704")
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Upstream(ListingsError::Auth)));
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped_not_fatal() {
        let cache = cache();
        let listings = MockListings::new(vec![
            json!({ "list_price": 100_000 }), // no address, uncacheable
            record("123 Main St", 250_000),
        ]);

        let outcome = cache
            .lookup(&listings, "123 Main St 62704", "62704")
            .await
            .unwrap();
        assert!(matches!(outcome, LookupOutcome::Found(_)));
    }

    #[tokio::test]
    async fn test_price_ceiling_filters_and_sorts() {
        let cache = cache();
        let listings = MockListings::new(vec![
            record("1 First St", 400_000),
            record("2 Second St", 100_000),
            record("3 Third St", 250_000),
        ]);

        let results = cache
            .search_by_price_ceiling(&listings, "62704", 250_000)
            .await
            .unwrap();
        let prices: Vec<_> = results.iter().map(|p| p.price.unwrap()).collect();
        assert_eq!(prices, vec![100_000, 250_000]);

        // Second search is cache-only.
        cache
            .search_by_price_ceiling(&listings, "62704", 250_000)
            .await
            .unwrap();
        assert_eq!(listings.calls(), 1);
    }

    #[tokio::test]
    async fn test_stale_rows_trigger_api_refresh() {
        let cache = cache();
        let listings = MockListings::new(vec![record("1 First St", 100_000)]);

        cache
            .search_by_price_ceiling(&listings, "62704", 250_000)
            .await
            .unwrap();
        assert_eq!(listings.calls(), 1);

        cache.store().backdate("62704", "1 first st", 361).unwrap();

        let results = cache
            .search_by_price_ceiling(&listings, "62704", 250_000)
            .await
            .unwrap();
        assert_eq!(listings.calls(), 2);
        assert_eq!(results.len(), 1); // refreshed row is fresh again
    }

    #[tokio::test]
    async fn test_city_search_accounts_cache_hits_and_api_calls() {
        let cache = cache();
        let listings = MockListings::new(vec![record("9 Ninth St", 150_000)]);
        let resolver = MockResolver {
            zips: vec!["62701".to_string(), "62704".to_string()],
        };

        // Pre-warm one of the two ZIPs.
        cache
            .store()
            .upsert(&crate::cache::extract::extract_property(
                &record("5 Fifth St", 120_000),
                "62701",
                Utc::now(),
            )
            .unwrap())
            .unwrap();

        let result = cache
            .search_by_city(&listings, &resolver, "Springfield", "IL", 250_000)
            .await
            .unwrap();

        assert_eq!(result.zips_searched, vec!["62701", "62704"]);
        assert_eq!(result.cache_hit_zips, vec!["62701"]);
        assert_eq!(result.api_zips, vec!["62704"]);
        assert!(result.failed_zips.is_empty());
        let prices: Vec<_> = result.properties.iter().map(|p| p.price.unwrap()).collect();
        assert_eq!(prices, vec![120_000, 150_000]);
    }

    #[tokio::test]
    async fn test_city_search_dedupes_by_address() {
        let cache = cache();
        let listings = MockListings::new(vec![record("9 Ninth St", 150_000)]);
        let resolver = MockResolver {
            zips: vec!["62701".to_string(), "62704".to_string()],
        };

        let result = cache
            .search_by_city(&listings, &resolver, "Springfield", "IL", 250_000)
            .await
            .unwrap();
        // The mock returns the same house for both ZIPs; only one survives.
        assert_eq!(result.properties.len(), 1);
    }

    #[tokio::test]
    async fn test_city_search_marks_failed_zips_separately() {
        let cache = cache();
        let listings = FlakyListings {
            bad_zip: "62701".to_string(),
            records: vec![record("9 Ninth St", 150_000)],
        };
        let resolver = MockResolver {
            zips: vec!["62701".to_string(), "62704".to_string()],
        };

        let result = cache
            .search_by_city(&listings, &resolver, "Springfield", "IL", 250_000)
            .await
            .unwrap();

        // The 503 ZIP is skipped but called out, not conflated with empty.
        assert_eq!(result.api_zips, vec!["62701", "62704"]);
        assert_eq!(result.failed_zips, vec!["62701"]);
        assert_eq!(result.properties.len(), 1);
    }

    #[tokio::test]
    async fn test_city_search_unknown_city() {
        let cache = cache();
        let listings = MockListings::new(vec![]);
        let resolver = MockResolver { zips: vec![] };

        let err = cache
            .search_by_city(&listings, &resolver, "Atlantis", "FL", 250_000)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::UnknownCity { .. }));
    }

    #[tokio::test]
    async fn test_purge_default_window_is_independent() {
        let cache = cache();
        let listings = MockListings::new(vec![record("1 First St", 100_000)]);
        cache
            .search_by_price_ceiling(&listings, "62704", 250_000)
            .await
            .unwrap();
        cache.store().backdate("62704", "1 first st", 100).unwrap();

        // Readable under the 360-day window, but purged at the 90-day default.
        assert_eq!(
            cache
                .store()
                .fresh_under_price("62704", 250_000, READ_FRESHNESS_DAYS)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(cache.purge_older_than(DEFAULT_PURGE_DAYS).unwrap(), 1);
    }
}

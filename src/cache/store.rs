use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

use super::types::CachedProperty;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt cached payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// Storage abstraction for the property cache.
///
/// Freshness-filtered reads return rows whose `last_updated` is strictly
/// newer than `max_age_days` ago; `fresh_by_zip` orders newest first,
/// `fresh_under_price` orders by ascending price and skips null prices.
pub trait PropertyStore {
    fn upsert(&self, prop: &CachedProperty) -> Result<(), StoreError>;
    fn fresh_by_zip(&self, zip: &str, max_age_days: i64) -> Result<Vec<CachedProperty>, StoreError>;
    fn fresh_under_price(
        &self,
        zip: &str,
        max_price: i64,
        max_age_days: i64,
    ) -> Result<Vec<CachedProperty>, StoreError>;
    /// Hard-delete rows older than the cutoff; returns the number deleted.
    fn purge_older_than(&self, days: i64) -> Result<usize, StoreError>;
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS cached_properties (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    zip_code TEXT NOT NULL,
    address TEXT NOT NULL,
    bedrooms INTEGER NOT NULL DEFAULT 0,
    bathrooms REAL NOT NULL DEFAULT 0,
    sqft INTEGER NOT NULL DEFAULT 0,
    lot_sqft INTEGER NOT NULL DEFAULT 0,
    lot_acres REAL NOT NULL DEFAULT 0,
    garage_cars INTEGER NOT NULL DEFAULT 0,
    year_built INTEGER,
    property_type TEXT NOT NULL DEFAULT 'Unknown',
    price INTEGER,
    photo_url TEXT,
    last_updated TEXT NOT NULL,
    raw_data TEXT NOT NULL,
    UNIQUE(zip_code, address)
);
CREATE INDEX IF NOT EXISTS idx_zip_code ON cached_properties(zip_code);
CREATE INDEX IF NOT EXISTS idx_address ON cached_properties(address);
CREATE INDEX IF NOT EXISTS idx_last_updated ON cached_properties(last_updated);
";

/// SQLite-backed `PropertyStore`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            // Store errors are typed; directory creation failures surface
            // through the subsequent open.
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("property store mutex poisoned");
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Force a row's `last_updated` back in time, for freshness tests.
    #[cfg(test)]
    pub(crate) fn backdate(&self, zip: &str, address: &str, days: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("property store mutex poisoned");
        let ts = fmt_ts(Utc::now() - Duration::days(days));
        conn.execute(
            "UPDATE cached_properties SET last_updated = ?1 WHERE zip_code = ?2 AND address = ?3",
            params![ts, zip, address],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn row_count(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock().expect("property store mutex poisoned");
        let count = conn.query_row("SELECT COUNT(*) FROM cached_properties", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    // Fixed precision keeps lexicographic and chronological order aligned
    // for the TEXT comparisons in the freshness queries.
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn cutoff(days: i64) -> String {
    fmt_ts(Utc::now() - Duration::days(days))
}

fn row_to_property(row: &Row<'_>) -> rusqlite::Result<(CachedProperty, String, String)> {
    Ok((
        CachedProperty {
            zip_code: row.get("zip_code")?,
            address: row.get("address")?,
            bedrooms: row.get("bedrooms")?,
            bathrooms: row.get("bathrooms")?,
            sqft: row.get("sqft")?,
            lot_sqft: row.get("lot_sqft")?,
            lot_acres: row.get("lot_acres")?,
            garage_cars: row.get("garage_cars")?,
            year_built: row.get("year_built")?,
            property_type: row.get("property_type")?,
            price: row.get("price")?,
            photo_url: row.get("photo_url")?,
            last_updated: Utc::now(), // patched below from the TEXT column
            raw: serde_json::Value::Null,
        },
        row.get::<_, String>("last_updated")?,
        row.get::<_, String>("raw_data")?,
    ))
}

fn finish_row(
    (mut prop, ts, raw): (CachedProperty, String, String),
) -> Result<CachedProperty, StoreError> {
    prop.last_updated = DateTime::parse_from_rfc3339(&ts)?.with_timezone(&Utc);
    prop.raw = serde_json::from_str(&raw)?;
    Ok(prop)
}

impl PropertyStore for SqliteStore {
    fn upsert(&self, prop: &CachedProperty) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("property store mutex poisoned");
        conn.execute(
            "INSERT INTO cached_properties
                 (zip_code, address, bedrooms, bathrooms, sqft, lot_sqft, lot_acres,
                  garage_cars, year_built, property_type, price, photo_url,
                  last_updated, raw_data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(zip_code, address) DO UPDATE SET
                 bedrooms = excluded.bedrooms,
                 bathrooms = excluded.bathrooms,
                 sqft = excluded.sqft,
                 lot_sqft = excluded.lot_sqft,
                 lot_acres = excluded.lot_acres,
                 garage_cars = excluded.garage_cars,
                 year_built = excluded.year_built,
                 property_type = excluded.property_type,
                 price = excluded.price,
                 photo_url = excluded.photo_url,
                 last_updated = excluded.last_updated,
                 raw_data = excluded.raw_data",
            params![
                prop.zip_code,
                prop.address,
                prop.bedrooms,
                prop.bathrooms,
                prop.sqft,
                prop.lot_sqft,
                prop.lot_acres,
                prop.garage_cars,
                prop.year_built,
                prop.property_type,
                prop.price,
                prop.photo_url,
                fmt_ts(prop.last_updated),
                serde_json::to_string(&prop.raw)?,
            ],
        )?;
        Ok(())
    }

    fn fresh_by_zip(&self, zip: &str, max_age_days: i64) -> Result<Vec<CachedProperty>, StoreError> {
        let conn = self.conn.lock().expect("property store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT * FROM cached_properties
             WHERE zip_code = ?1 AND last_updated > ?2
             ORDER BY last_updated DESC",
        )?;
        let rows = stmt.query_map(params![zip, cutoff(max_age_days)], row_to_property)?;
        rows.map(|r| finish_row(r?)).collect()
    }

    fn fresh_under_price(
        &self,
        zip: &str,
        max_price: i64,
        max_age_days: i64,
    ) -> Result<Vec<CachedProperty>, StoreError> {
        let conn = self.conn.lock().expect("property store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT * FROM cached_properties
             WHERE zip_code = ?1
               AND price IS NOT NULL
               AND price <= ?2
               AND last_updated > ?3
             ORDER BY price ASC",
        )?;
        let rows = stmt.query_map(params![zip, max_price, cutoff(max_age_days)], row_to_property)?;
        rows.map(|r| finish_row(r?)).collect()
    }

    fn purge_older_than(&self, days: i64) -> Result<usize, StoreError> {
        let conn = self.conn.lock().expect("property store mutex poisoned");
        let deleted = conn.execute(
            "DELETE FROM cached_properties WHERE last_updated < ?1",
            params![cutoff(days)],
        )?;
        Ok(deleted)
    }
}

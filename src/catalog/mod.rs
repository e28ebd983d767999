use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

use crate::scoring::{calculate_score, FeatureSet, ScoreBreakdown};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt stored house record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("no house with id {0}")]
    NotFound(i64),
}

/// A cataloged house: the saved feature set plus the score computed from it.
/// The score and breakdown are recomputed on every write, so a stored house
/// never carries a score that disagrees with its features.
#[derive(Debug, Clone)]
pub struct House {
    pub id: i64,
    pub address: String,
    pub features: FeatureSet,
    pub notes: Option<String>,
    pub score: i64,
    pub breakdown: ScoreBreakdown,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS houses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL,
    features TEXT NOT NULL,
    notes TEXT,
    score INTEGER NOT NULL,
    breakdown TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_houses_score ON houses(score);
";

/// SQLite-backed catalog of houses under consideration.
pub struct HouseCatalog {
    conn: Mutex<Connection>,
}

impl HouseCatalog {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        let catalog = Self {
            conn: Mutex::new(conn),
        };
        catalog.initialize()?;
        Ok(catalog)
    }

    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self {
            conn: Mutex::new(conn),
        };
        catalog.initialize()?;
        Ok(catalog)
    }

    fn initialize(&self) -> Result<(), CatalogError> {
        let conn = self.conn.lock().expect("catalog mutex poisoned");
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Insert a house, scoring its features as part of the write.
    pub fn add(
        &self,
        address: &str,
        features: &FeatureSet,
        notes: Option<&str>,
    ) -> Result<House, CatalogError> {
        let breakdown = calculate_score(features);
        let now = Utc::now();
        let conn = self.conn.lock().expect("catalog mutex poisoned");
        conn.execute(
            "INSERT INTO houses (address, features, notes, score, breakdown, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                address,
                serde_json::to_string(features)?,
                notes,
                breakdown.total,
                serde_json::to_string(&breakdown)?,
                fmt_ts(now),
                fmt_ts(now),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get(id)
    }

    /// All houses, best score first. Ties break newest-first so a fresh
    /// entry with the same score surfaces above an old one.
    pub fn list(&self) -> Result<Vec<House>, CatalogError> {
        let conn = self.conn.lock().expect("catalog mutex poisoned");
        let mut stmt =
            conn.prepare("SELECT * FROM houses ORDER BY score DESC, updated_at DESC")?;
        let rows = stmt.query_map([], row_to_house)?;
        rows.map(|r| finish_row(r?)).collect()
    }

    pub fn get(&self, id: i64) -> Result<House, CatalogError> {
        let conn = self.conn.lock().expect("catalog mutex poisoned");
        let row = conn
            .query_row("SELECT * FROM houses WHERE id = ?1", params![id], row_to_house)
            .optional()?;
        match row {
            Some(r) => finish_row(r),
            None => Err(CatalogError::NotFound(id)),
        }
    }

    /// Replace a house's features (and optionally its notes), rescoring it.
    pub fn update(
        &self,
        id: i64,
        features: &FeatureSet,
        notes: Option<&str>,
    ) -> Result<House, CatalogError> {
        let breakdown = calculate_score(features);
        let conn = self.conn.lock().expect("catalog mutex poisoned");
        let changed = conn.execute(
            "UPDATE houses
             SET features = ?2, notes = COALESCE(?3, notes), score = ?4,
                 breakdown = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                id,
                serde_json::to_string(features)?,
                notes,
                breakdown.total,
                serde_json::to_string(&breakdown)?,
                fmt_ts(Utc::now()),
            ],
        )?;
        drop(conn);
        if changed == 0 {
            return Err(CatalogError::NotFound(id));
        }
        self.get(id)
    }

    pub fn remove(&self, id: i64) -> Result<(), CatalogError> {
        let conn = self.conn.lock().expect("catalog mutex poisoned");
        let deleted = conn.execute("DELETE FROM houses WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(CatalogError::NotFound(id));
        }
        Ok(())
    }

    /// Drop every house. Returns the number removed.
    pub fn clear(&self) -> Result<usize, CatalogError> {
        let conn = self.conn.lock().expect("catalog mutex poisoned");
        Ok(conn.execute("DELETE FROM houses", [])?)
    }

    /// Populate the catalog with a few contrasting sample houses.
    pub fn seed(&self) -> Result<Vec<House>, CatalogError> {
        let mut seeded = Vec::new();
        for (address, features, notes) in sample_houses() {
            seeded.push(self.add(address, &features, Some(notes))?);
        }
        Ok(seeded)
    }
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn row_to_house(row: &Row<'_>) -> rusqlite::Result<(i64, String, String, Option<String>, String, String, String)> {
    Ok((
        row.get("id")?,
        row.get("address")?,
        row.get("features")?,
        row.get("notes")?,
        row.get("breakdown")?,
        row.get("created_at")?,
        row.get("updated_at")?,
    ))
}

fn finish_row(
    (id, address, features, notes, breakdown, created_at, updated_at): (
        i64,
        String,
        String,
        Option<String>,
        String,
        String,
        String,
    ),
) -> Result<House, CatalogError> {
    let breakdown: ScoreBreakdown = serde_json::from_str(&breakdown)?;
    Ok(House {
        id,
        address,
        features: serde_json::from_str(&features)?,
        notes,
        score: breakdown.total,
        breakdown,
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)?.with_timezone(&Utc),
    })
}

fn sample_houses() -> Vec<(&'static str, FeatureSet, &'static str)> {
    use crate::scoring::{ApplianceCondition, BathroomQuality, NoiseLevel, Privacy};

    let mut well_kept = FeatureSet::default();
    well_kept.garage_cars = 2;
    well_kept.bathrooms = 2;
    well_kept.bathroom_quality = BathroomQuality::Modern;
    well_kept.bedrooms = 3;
    well_kept.square_feet = 1900;
    well_kept.lot_acres = 0.3;
    well_kept.nice_backyard = true;
    well_kept.curb_appeal = true;
    well_kept.basement = 2;
    well_kept.privacy = Privacy::Private;
    well_kept.has_deck = true;
    well_kept.near_recreation = true;
    for name in ["dishwasher", "range", "oven", "fridge", "washer", "dryer", "microwave"] {
        well_kept
            .appliances
            .insert(name.to_string(), ApplianceCondition::Modern);
    }

    let mut fixer = FeatureSet::default();
    fixer.bathrooms = 1;
    fixer.bathroom_quality = BathroomQuality::NeedsUpdates;
    fixer.bedrooms = 2;
    fixer.square_feet = 1100;
    fixer.noise_level = NoiseLevel::Loud;
    fixer
        .appliances
        .insert("oven".to_string(), ApplianceCondition::Old);

    let mut hoa_condo = FeatureSet::default();
    hoa_condo.bathrooms = 2;
    hoa_condo.bedrooms = 2;
    hoa_condo.square_feet = 1300;
    hoa_condo.walking_shopping = true;
    hoa_condo.has_hoa = true;
    hoa_condo.hoa_monthly_fee = 250;
    for name in ["dishwasher", "range", "fridge", "microwave"] {
        hoa_condo
            .appliances
            .insert(name.to_string(), ApplianceCondition::Other);
    }

    vec![
        ("412 Birchwood Ln", well_kept, "Move-in ready, backs onto the greenbelt"),
        ("88 Frontage Rd", fixer, "Cheap but loud; next to the highway"),
        ("210 Commerce St #4", hoa_condo, "Walkable, HOA fee is steep"),
    ]
}

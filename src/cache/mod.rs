pub mod extract;
pub mod matcher;
pub mod store;
pub mod types;

pub use matcher::{
    CitySearch, LookupOutcome, PropertyCache, SearchError, DEFAULT_PURGE_DAYS,
    READ_FRESHNESS_DAYS,
};
pub use store::{PropertyStore, SqliteStore, StoreError};
pub use types::CachedProperty;

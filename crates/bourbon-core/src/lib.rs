//! Bourbon bottle price lookup: synonym-aware search, budget filtering and
//! price checks over a cached, periodically refreshed price table.

pub mod dataset;
pub mod query;
pub mod remote;
pub mod service;
pub mod store;
pub mod synonyms;
pub mod telemetry;

pub use dataset::{BottleRecord, CellValue, Dataset, PriceCheck, PricePosition, QueryError};
pub use query::{Predicate, QueryItem, TranslatedQuery, translate};
pub use remote::{Credentials, FetchError};
pub use store::{CacheState, DataStore, StoreConfig, UpdateReport};

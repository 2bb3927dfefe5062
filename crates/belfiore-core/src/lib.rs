//! Core library for belfiore.
//!
//! Provides cached, read-only access to Belfiore place datasets (Italian
//! cities and foreign countries identified by a cadastral code):
//!
//! - `models`: the `Place` record and code matchers
//! - `filter`: filter criteria and the inclusion predicate
//! - `cache`: the shared, lazily refreshed TTL cache
//! - `connector`: immutable views with derivation and query operations
//! - `source`: ready-made retrievers (JSON file, HTTP)
//! - `config`: connector configuration loading

pub mod cache;
pub mod config;
pub mod connector;
pub mod error;
pub mod filter;
pub mod models;
pub mod source;
pub mod utils;

pub use cache::{PlacesCache, PlacesRetriever};
pub use config::ConnectorConfig;
pub use connector::{BelfioreConnector, ConnectorOptions};
pub use error::ConnectorError;
pub use filter::{FilterChain, FilterCriteria};
pub use models::{CodeMatcher, Place};

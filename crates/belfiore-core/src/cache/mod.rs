//! In-memory caching of place datasets.
//!
//! This module provides the `PlacesCache`, a lazily populated snapshot of
//! every place returned by a retriever, refreshed once its TTL elapses.
//! A single `PlacesCache` is shared by every view derived from the same
//! connector, so one refresh serves all of them.
//!
//! Each view keeps its own filtered copy of the current snapshot in a
//! `FilteredSnapshot`, rebuilt only when the shared snapshot changes.

pub mod filtered;
pub mod manager;

pub use filtered::FilteredSnapshot;
pub use manager::{system_clock, CacheSnapshot, Clock, PlacesCache, PlacesRetriever};

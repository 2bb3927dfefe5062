//! Ready-made place retrievers.
//!
//! Any async closure returning `anyhow::Result<Vec<Place>>` is a retriever;
//! this module adds the two a host usually needs:
//!
//! - `JsonFileSource`: a JSON array of places on disk
//! - `HttpSource`: a JSON array of places served over HTTP

pub mod error;
pub mod file;
pub mod http;

pub use error::SourceError;
pub use file::JsonFileSource;
pub use http::HttpSource;

//! Data models for Belfiore places.
//!
//! - `Place`: a city or country record keyed by its Belfiore code
//! - `CodeMatcher`: the city/country split encoded in the code

pub mod place;

pub use place::{is_place_code, is_province_code, CodeMatcher, Place};

//! Utility functions for date parsing.

pub mod date;

pub use date::{parse_date, today};

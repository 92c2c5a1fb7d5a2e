//! # Output Formats
//!
//! JSON rendering of query results.
//!
//! File I/O operations are in the app layer.

mod json;

pub use json::*;

//! Note search: routing plus the SQLite full-text query layer.
//!
//! # Responsibility
//! - Prefer the backend's native full-text index.
//! - Fall back to a substring scan that every backend can serve.

pub mod engine;
pub mod fts;

pub use engine::{SearchEngine, SearchOutcome, SearchPath, SearchQuery};

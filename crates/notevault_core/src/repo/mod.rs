//! Backend-agnostic data access over the storage contract.
//!
//! # Responsibility
//! - Express use-case reads (note listings, catalog lookups) as scans.
//! - Own the note↔tag relation and its usage counters.
//!
//! # Invariants
//! - Every function is generic over `StorageRead`, so the same code runs on
//!   both backends and inside units of work.
//! - Notes leave this layer with `tag_ids` hydrated from relation rows.

pub mod catalog_repo;
pub mod note_repo;
pub mod relation_repo;

pub use note_repo::{NoteFilter, NoteListQuery};
pub use relation_repo::TagDiff;

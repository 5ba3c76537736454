//! Local note storage with interchangeable object and relational backends.
//! This crate is the single source of truth for note, category and tag
//! invariants.

pub mod analytics;
pub mod backend;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod store;

pub use analytics::{AnalyticsEvent, AnalyticsRecorder};
pub use backend::{BackendCapabilities, BackendKind, Direction, Field, OrderBy};
pub use config::{StorageLocation, StoreConfig, DEFAULT_ANALYTICS_CAPACITY};
pub use error::{StoreError, StoreResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{
    Category, CategoryDraft, CategoryPatch, EntityKind, Note, NoteDraft, NotePatch, NoteTag,
    Priority, SyncStatus, Tag, TagDraft, TagPatch, DEFAULT_CATEGORY_ID, DEFAULT_CATEGORY_NAME,
};
pub use repo::{NoteFilter, NoteListQuery};
pub use search::{SearchPath, SearchQuery};
pub use service::{ExportDocument, ImportSummary, EXPORT_FORMAT_VERSION};
pub use store::{NoteStore, StoreStats};

/// Minimal health-check API for linkage probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

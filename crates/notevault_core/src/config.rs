//! Store configuration value objects.
//!
//! # Responsibility
//! - Select the backend strategy and where it keeps its data.
//! - Carry tunables (native search toggle, analytics capacity) and the
//!   predefined categories/tags seeded on first initialization.
//!
//! # Invariants
//! - Configuration is plain data; nothing here touches global state.

use crate::backend::BackendKind;
use crate::model::{CategoryDraft, TagDraft};
use std::path::{Path, PathBuf};

/// Default bound of the analytics event log.
pub const DEFAULT_ANALYTICS_CAPACITY: usize = 1000;

/// Where a backend keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// Process-local, discarded on close.
    InMemory,
    /// SQLite database file or object-store snapshot file.
    Path(PathBuf),
}

impl StorageLocation {
    /// Short label used in log lines.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::InMemory => "memory",
            Self::Path(_) => "file",
        }
    }
}

/// Construction parameters of a [`crate::NoteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub location: StorageLocation,
    /// Allows the search engine to use the backend's full-text index.
    pub native_search: bool,
    pub analytics_capacity: usize,
    /// Categories created on first initialization, in addition to `default`.
    pub seed_categories: Vec<CategoryDraft>,
    /// Tags created on first initialization.
    pub seed_tags: Vec<TagDraft>,
}

impl StoreConfig {
    pub fn in_memory(backend: BackendKind) -> Self {
        Self::with_location(backend, StorageLocation::InMemory)
    }

    pub fn at_path(backend: BackendKind, path: impl AsRef<Path>) -> Self {
        Self::with_location(backend, StorageLocation::Path(path.as_ref().to_path_buf()))
    }

    fn with_location(backend: BackendKind, location: StorageLocation) -> Self {
        Self {
            backend,
            location,
            native_search: true,
            analytics_capacity: DEFAULT_ANALYTICS_CAPACITY,
            seed_categories: Vec::new(),
            seed_tags: Vec::new(),
        }
    }

    pub fn native_search(mut self, enabled: bool) -> Self {
        self.native_search = enabled;
        self
    }

    pub fn analytics_capacity(mut self, capacity: usize) -> Self {
        self.analytics_capacity = capacity;
        self
    }

    pub fn seed_category(mut self, draft: CategoryDraft) -> Self {
        self.seed_categories.push(draft);
        self
    }

    pub fn seed_tag(mut self, draft: TagDraft) -> Self {
        self.seed_tags.push(draft);
        self
    }
}

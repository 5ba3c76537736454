//! Storage backend contract and its two strategies.
//!
//! # Responsibility
//! - Define the `StorageBackend` contract shared by every persistence strategy.
//! - Host the object store (schemaless documents + emulated indexes) and the
//!   relational store (SQLite tables + native indexes + optional FTS).
//!
//! # Invariants
//! - Every data operation fails with `NotInitialized` before `initialize()`.
//! - `get` never fails for a missing key; `delete` of a missing key is a no-op.
//! - Writes inside one `transaction` become visible together or not at all.

pub mod object_store;
pub mod query;
pub mod relational;

use crate::db::DbError;
use crate::error::StoreResult;
use crate::model::{EntityKind, ModelValidationError, Record};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use object_store::ObjectStore;
pub use query::{Direction, Field, FieldValue, OrderBy, Predicate, ScanQuery};
pub use relational::RelationalStore;

pub type BackendResult<T> = Result<T, BackendError>;

/// Transport-level failures raised by storage backends.
#[derive(Debug)]
pub enum BackendError {
    /// Data operation issued before `initialize()` succeeded.
    NotInitialized,
    /// SQLite bootstrap or query failure.
    Db(DbError),
    /// File I/O failure of the object store snapshot.
    Io(std::io::Error),
    /// Record (de)serialization failure.
    Codec(serde_json::Error),
    /// Record rejected by entity validation before persistence.
    Validation(ModelValidationError),
    /// Persisted state cannot be mapped back to a record.
    InvalidData(String),
    /// Native full-text search cannot serve this request.
    SearchUnavailable(String),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "storage backend is not initialized"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "storage i/o failed: {err}"),
            Self::Codec(err) => write!(f, "record codec failed: {err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::SearchUnavailable(reason) => write!(f, "native search unavailable: {reason}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for BackendError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value)
    }
}

impl From<ModelValidationError> for BackendError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Which persistence strategy backs a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Schemaless key→document store with emulated secondary indexes.
    Object,
    /// SQLite tables with native indexes and optional FTS.
    Relational,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Relational => "relational",
        }
    }

    /// Parses a backend name; accepts common aliases, case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "object" | "document" => Some(Self::Object),
            "relational" | "sqlite" | "sql" => Some(Self::Relational),
            _ => None,
        }
    }
}

/// Capabilities probed once during `initialize()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BackendCapabilities {
    /// A native full-text index serves `search_native`.
    pub native_search: bool,
    /// Secondary indexes and ordering are provided by the storage engine.
    pub native_indexes: bool,
}

/// Read primitives available both outside and inside a transaction.
pub trait StorageRead {
    /// Returns the record stored under `key`, or `None`.
    fn get(&self, kind: EntityKind, key: &str) -> BackendResult<Option<Record>>;
    /// Lowest-level retrieval primitive; filtering and paging build on it.
    fn scan(&self, query: &ScanQuery) -> BackendResult<Vec<Record>>;
    /// Number of records of `kind`.
    fn count(&self, kind: EntityKind) -> BackendResult<u64>;
}

/// Write primitives scoped to one unit of work.
pub trait StorageOps: StorageRead {
    /// Insert-or-replace by primary key; returns the key.
    fn put(&mut self, record: &Record) -> BackendResult<String>;
    /// Removes a record; missing keys are a no-op.
    fn delete(&mut self, kind: EntityKind, key: &str) -> BackendResult<()>;
    /// Removes every record of every kind.
    fn clear_all(&mut self) -> BackendResult<()>;
}

/// Unit of work executed by [`StorageBackend::transaction`].
pub type UnitOfWork<'w> = dyn FnMut(&mut dyn StorageOps) -> StoreResult<()> + 'w;

/// Persistence strategy contract shared by both backends.
pub trait StorageBackend: StorageRead {
    fn kind(&self) -> BackendKind;

    /// Creates underlying structures if absent. Idempotent.
    fn initialize(&mut self) -> BackendResult<()>;

    fn is_initialized(&self) -> bool;

    /// Capabilities determined by the last successful `initialize()`.
    fn capabilities(&self) -> BackendCapabilities;

    /// Single-record write committed on its own.
    fn put(&mut self, record: &Record) -> StoreResult<String> {
        let mut key = String::new();
        self.transaction(&mut |ops| {
            key = ops.put(record)?;
            Ok(())
        })?;
        Ok(key)
    }

    /// Single-record delete committed on its own.
    fn delete(&mut self, kind: EntityKind, key: &str) -> StoreResult<()> {
        self.transaction(&mut |ops| {
            ops.delete(kind, key)?;
            Ok(())
        })
    }

    /// Runs `work` atomically: every write is committed, or none is.
    fn transaction(&mut self, work: &mut UnitOfWork<'_>) -> StoreResult<()>;

    /// Ranked note ids from the native full-text index.
    ///
    /// Returns `SearchUnavailable` when the backend cannot serve `text`.
    fn search_native(&self, text: &str, limit: Option<u32>) -> BackendResult<Vec<String>>;

    /// Releases underlying resources. The backend must be re-initialized
    /// before further use.
    fn close(&mut self) -> BackendResult<()>;
}

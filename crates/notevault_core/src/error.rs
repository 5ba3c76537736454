//! Store-level error contract.
//!
//! # Responsibility
//! - Expose the caller-facing error kinds of the repository façade.
//! - Map backend transport failures onto semantic kinds where possible.
//!
//! # Invariants
//! - `SearchUnavailable` never appears here; the search engine recovers it.
//! - SQLite constraint failures surface as `ConstraintViolation`.

use crate::backend::BackendError;
use crate::db::DbError;
use crate::model::{EntityKind, ModelValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by [`crate::NoteStore`] operations.
#[derive(Debug)]
pub enum StoreError {
    /// An operation ran before `initialize()` succeeded.
    StorageNotInitialized,
    /// Update or reference targeted a missing id.
    NotFound { kind: EntityKind, id: String },
    /// Reserved-entity deletion or uniqueness conflict.
    ConstraintViolation(String),
    /// Import document is malformed or has an unsupported version.
    ImportFormat(String),
    /// Input failed entity validation.
    Validation(ModelValidationError),
    /// Storage medium failure.
    Backend(BackendError),
}

impl StoreError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StorageNotInitialized => "storage_not_initialized",
            Self::NotFound { .. } => "not_found",
            Self::ConstraintViolation(_) => "constraint_violation",
            Self::ImportFormat(_) => "import_format",
            Self::Validation(_) => "validation",
            Self::Backend(_) => "backend",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageNotInitialized => write!(f, "storage is not initialized"),
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::ImportFormat(message) => write!(f, "invalid import document: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for StoreError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<BackendError> for StoreError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::NotInitialized => Self::StorageNotInitialized,
            BackendError::Validation(err) => Self::Validation(err),
            BackendError::Db(DbError::Sqlite(err)) if is_constraint_violation(&err) => {
                Self::ConstraintViolation(err.to_string())
            }
            other => Self::Backend(other),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::from(BackendError::Db(value))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

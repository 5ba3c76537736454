//! Entity model for the note storage layer.
//!
//! # Responsibility
//! - Define plain data records: notes, categories, tags, note/tag relations.
//! - Provide input shapes (drafts/patches) and shared validation helpers.
//!
//! # Invariants
//! - Records carry no persistence behavior.
//! - Identifiers are non-blank and free of control characters.

pub mod category;
pub mod note;
pub mod record;
pub mod tag;

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use category::{
    Category, CategoryDraft, CategoryPatch, DEFAULT_CATEGORY_ID, DEFAULT_CATEGORY_NAME,
};
pub use note::{Note, NoteDraft, NoteId, NotePatch, Priority, SyncStatus};
pub use record::{relation_key, split_relation_key, EntityKind, NoteTag, Record};
pub use tag::{normalize_tag_name, normalize_tag_names, Tag, TagDraft, TagPatch};

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").expect("valid hex color regex")
});

/// Validation errors for entity invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    BlankId(&'static str),
    InvalidId { field: &'static str, value: String },
    BlankName(&'static str),
    InvalidColor { field: &'static str, value: String },
    TimestampOrder {
        id: String,
        created_at: i64,
        updated_at: i64,
    },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId(field) => write!(f, "{field} must not be blank"),
            Self::InvalidId { field, value } => {
                write!(f, "{field} contains control characters: {value:?}")
            }
            Self::BlankName(field) => write!(f, "{field} must not be blank"),
            Self::InvalidColor { field, value } => {
                write!(f, "{field} must be #RRGGBB or #AARRGGBB, got `{value}`")
            }
            Self::TimestampOrder {
                id,
                created_at,
                updated_at,
            } => write!(
                f,
                "record {id} has updatedAt {updated_at} earlier than createdAt {created_at}"
            ),
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn validate_id(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::BlankId(field));
    }
    if value.chars().any(char::is_control) {
        return Err(ModelValidationError::InvalidId {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn validate_name(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::BlankName(field));
    }
    Ok(())
}

pub(crate) fn validate_color(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if HEX_COLOR_RE.is_match(value) {
        Ok(())
    } else {
        Err(ModelValidationError::InvalidColor {
            field,
            value: value.to_string(),
        })
    }
}

//! Storage-level record envelope shared by every backend.
//!
//! # Responsibility
//! - Name the entity kinds the storage contract addresses.
//! - Wrap typed entities in one tagged union so backends stay generic.
//!
//! # Invariants
//! - `Record::key()` is the primary key inside its kind.
//! - Relation keys join `note_id` and `tag_id` with a unit separator, which
//!   validated ids never contain.

use super::{validate_id, Category, ModelValidationError, Note, Tag};
use serde::{Deserialize, Serialize};

/// Separator used inside composite relation keys.
pub const RELATION_KEY_SEPARATOR: char = '\u{1f}';

/// Entity collections addressed by the storage contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Note,
    Category,
    Tag,
    NoteTag,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [Self::Category, Self::Tag, Self::Note, Self::NoteTag];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Category => "category",
            Self::Tag => "tag",
            Self::NoteTag => "note_tag",
        }
    }
}

/// One note/tag association row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTag {
    pub note_id: String,
    pub tag_id: String,
}

impl NoteTag {
    pub fn new(note_id: impl Into<String>, tag_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            tag_id: tag_id.into(),
        }
    }

    pub fn key(&self) -> String {
        relation_key(&self.note_id, &self.tag_id)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_id("relation.noteId", &self.note_id)?;
        validate_id("relation.tagId", &self.tag_id)
    }
}

/// Builds the composite key of one relation row.
pub fn relation_key(note_id: &str, tag_id: &str) -> String {
    format!("{note_id}{RELATION_KEY_SEPARATOR}{tag_id}")
}

/// Splits a composite relation key back into `(note_id, tag_id)`.
pub fn split_relation_key(key: &str) -> Option<(&str, &str)> {
    key.split_once(RELATION_KEY_SEPARATOR)
}

/// Tagged union of every persisted entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Note(Note),
    Category(Category),
    Tag(Tag),
    NoteTag(NoteTag),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Note(_) => EntityKind::Note,
            Self::Category(_) => EntityKind::Category,
            Self::Tag(_) => EntityKind::Tag,
            Self::NoteTag(_) => EntityKind::NoteTag,
        }
    }

    pub fn key(&self) -> String {
        match self {
            Self::Note(note) => note.id.clone(),
            Self::Category(category) => category.id.clone(),
            Self::Tag(tag) => tag.id.clone(),
            Self::NoteTag(relation) => relation.key(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        match self {
            Self::Note(note) => note.validate(),
            Self::Category(category) => category.validate(),
            Self::Tag(tag) => tag.validate(),
            Self::NoteTag(relation) => relation.validate(),
        }
    }

    pub fn into_note(self) -> Option<Note> {
        match self {
            Self::Note(note) => Some(note),
            _ => None,
        }
    }

    pub fn into_category(self) -> Option<Category> {
        match self {
            Self::Category(category) => Some(category),
            _ => None,
        }
    }

    pub fn into_tag(self) -> Option<Tag> {
        match self {
            Self::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn into_relation(self) -> Option<NoteTag> {
        match self {
            Self::NoteTag(relation) => Some(relation),
            _ => None,
        }
    }
}

//! Note domain model.
//!
//! # Responsibility
//! - Define the primary note record and its create/patch inputs.
//! - Keep ordinal enums (`Priority`, `SyncStatus`) stable for persistence.
//!
//! # Invariants
//! - `id` is immutable once created.
//! - `updated_at >= created_at` for every persisted note.
//! - `tag_ids` is a projection of the note/tag relation, never a second
//!   source of truth.

use super::{validate_id, ModelValidationError, DEFAULT_CATEGORY_ID};
use serde::{Deserialize, Serialize};

/// Stable note identifier.
pub type NoteId = String;

/// Ordinal note priority. Ordering follows the declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Ordinal used by storage columns and indexes.
    pub fn ordinal(self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }

    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            3 => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Sync marker. No protocol is attached to these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Unsynced,
    Syncing,
    Synced,
    Conflict,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsynced => "unsynced",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Conflict => "conflict",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unsynced" => Some(Self::Unsynced),
            "syncing" => Some(Self::Syncing),
            "synced" => Some(Self::Synced),
            "conflict" => Some(Self::Conflict),
            _ => None,
        }
    }
}

/// Primary note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// `None` resolves to the reserved default category.
    #[serde(default)]
    pub category_id: Option<String>,
    /// Sorted tag ids joined through the relation table.
    #[serde(default)]
    pub tag_ids: Vec<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds, assigned by the store on every mutation.
    pub updated_at: i64,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub remind_at: Option<i64>,
    /// Marker only; content is stored as provided.
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub last_synced_at: Option<i64>,
}

impl Note {
    /// Category id with `None` resolved to the default category.
    pub fn effective_category_id(&self) -> &str {
        self.category_id.as_deref().unwrap_or(DEFAULT_CATEGORY_ID)
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_id("note.id", &self.id)?;
        if let Some(category_id) = self.category_id.as_deref() {
            validate_id("note.categoryId", category_id)?;
        }
        if self.updated_at < self.created_at {
            return Err(ModelValidationError::TimestampOrder {
                id: self.id.clone(),
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }
}

/// Input for note creation. Server-assigned fields are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub category_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub is_favorite: bool,
    pub is_archived: bool,
    pub priority: Priority,
    pub remind_at: Option<i64>,
    pub encrypted: bool,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn in_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<String>) -> Self {
        self.tag_ids = tag_ids;
        self
    }

    pub fn favorite(mut self, value: bool) -> Self {
        self.is_favorite = value;
        self
    }

    pub fn archived(mut self, value: bool) -> Self {
        self.is_archived = value;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Partial note update. `None` leaves a field untouched.
///
/// Double options distinguish "leave as is" (`None`) from "clear"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Option<String>>,
    /// Replaces the full tag set when present.
    pub tag_ids: Option<Vec<String>>,
    pub is_favorite: Option<bool>,
    pub is_archived: Option<bool>,
    pub priority: Option<Priority>,
    pub remind_at: Option<Option<i64>>,
    pub encrypted: Option<bool>,
    pub sync_status: Option<SyncStatus>,
    pub last_synced_at: Option<Option<i64>>,
}

impl NotePatch {
    /// Returns true when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies scalar fields onto `note`. Tags are handled by the relation layer.
    pub(crate) fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(category_id) = &self.category_id {
            note.category_id = category_id.clone();
        }
        if let Some(value) = self.is_favorite {
            note.is_favorite = value;
        }
        if let Some(value) = self.is_archived {
            note.is_archived = value;
        }
        if let Some(priority) = self.priority {
            note.priority = priority;
        }
        if let Some(remind_at) = self.remind_at {
            note.remind_at = remind_at;
        }
        if let Some(value) = self.encrypted {
            note.encrypted = value;
        }
        if let Some(status) = self.sync_status {
            note.sync_status = status;
        }
        if let Some(last_synced_at) = self.last_synced_at {
            note.last_synced_at = last_synced_at;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Note, NotePatch, Priority, SyncStatus};

    fn sample() -> Note {
        Note {
            id: "n1".to_string(),
            title: "title".to_string(),
            content: "body".to_string(),
            category_id: None,
            tag_ids: Vec::new(),
            created_at: 10,
            updated_at: 10,
            is_favorite: false,
            is_archived: false,
            priority: Priority::Medium,
            remind_at: None,
            encrypted: false,
            sync_status: SyncStatus::Unsynced,
            last_synced_at: None,
        }
    }

    #[test]
    fn priority_ordinal_round_trips_and_orders() {
        for priority in [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent] {
            assert_eq!(Priority::from_ordinal(priority.ordinal()), Some(priority));
        }
        assert!(Priority::Low < Priority::Urgent);
        assert_eq!(Priority::from_ordinal(9), None);
    }

    #[test]
    fn null_category_resolves_to_default() {
        assert_eq!(sample().effective_category_id(), "default");
    }

    #[test]
    fn validate_rejects_updated_before_created() {
        let mut note = sample();
        note.updated_at = 5;
        assert!(note.validate().is_err());
    }

    #[test]
    fn patch_can_clear_optional_fields() {
        let mut note = sample();
        note.remind_at = Some(99);
        note.category_id = Some("work".to_string());
        let patch = NotePatch {
            remind_at: Some(None),
            category_id: Some(None),
            ..NotePatch::default()
        };
        patch.apply_to(&mut note);
        assert_eq!(note.remind_at, None);
        assert_eq!(note.category_id, None);
        assert!(NotePatch::default().is_empty());
    }

    #[test]
    fn serializes_camel_case_fields() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("categoryId").is_some());
        assert_eq!(value["syncStatus"], "unsynced");
        assert_eq!(value["priority"], "medium");
    }
}

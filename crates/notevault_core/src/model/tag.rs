//! Tag domain model.
//!
//! # Invariants
//! - `name` is trimmed, lowercase and unique.
//! - `usage_count` mirrors the number of note/tag relation rows and is only
//!   written by the relation layer.

use super::{validate_color, validate_id, validate_name, ModelValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Label attachable to many notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub usage_count: u64,
    pub created_at: i64,
}

impl Tag {
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_id("tag.id", &self.id)?;
        validate_name("tag.name", &self.name)?;
        if let Some(color) = self.color.as_deref() {
            validate_color("tag.color", color)?;
        }
        Ok(())
    }
}

/// Input for tag creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDraft {
    /// Caller-chosen id; a UUID is generated when absent.
    pub id: Option<String>,
    pub name: String,
    pub color: Option<String>,
}

impl TagDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Partial tag update. `usage_count` is deliberately not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPatch {
    pub name: Option<String>,
    pub color: Option<Option<String>>,
}

/// Normalizes one tag name: trimmed and lowercased.
pub fn normalize_tag_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag names, sorted.
pub fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut unique = BTreeSet::new();
    for name in names {
        if let Some(value) = normalize_tag_name(name) {
            unique.insert(value);
        }
    }
    unique.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{normalize_tag_name, normalize_tag_names};

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_tag_name("  Urgent "), Some("urgent".to_string()));
        assert_eq!(normalize_tag_name("   "), None);
    }

    #[test]
    fn normalize_many_deduplicates() {
        let names = vec!["Work".to_string(), "work".to_string(), "IDEA".to_string()];
        assert_eq!(
            normalize_tag_names(&names),
            vec!["idea".to_string(), "work".to_string()]
        );
    }
}

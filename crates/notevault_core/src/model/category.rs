//! Category domain model.
//!
//! # Invariants
//! - `name` is unique across categories (ASCII case-insensitive).
//! - The reserved default category (`id = "default"`) always exists.

use super::{validate_color, validate_id, validate_name, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Reserved category id every store carries.
pub const DEFAULT_CATEGORY_ID: &str = "default";
/// Display name of the reserved category.
pub const DEFAULT_CATEGORY_NAME: &str = "General";

/// Grouping record for notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub created_at: i64,
    /// Display ordering, ascending.
    #[serde(default)]
    pub order: i64,
}

impl Category {
    /// Builds the reserved default category.
    pub fn default_category(created_at: i64) -> Self {
        Self {
            id: DEFAULT_CATEGORY_ID.to_string(),
            name: DEFAULT_CATEGORY_NAME.to_string(),
            description: Some("Notes without a specific category".to_string()),
            color: Some("#607D8B".to_string()),
            icon: Some("folder".to_string()),
            created_at,
            order: 0,
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_CATEGORY_ID
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        validate_id("category.id", &self.id)?;
        validate_name("category.name", &self.name)?;
        if let Some(color) = self.color.as_deref() {
            validate_color("category.color", color)?;
        }
        Ok(())
    }
}

/// Input for category creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDraft {
    /// Caller-chosen id; a UUID is generated when absent.
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    /// Defaults to one past the current maximum when absent.
    pub order: Option<i64>,
}

impl CategoryDraft {
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

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Partial category update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub order: Option<i64>,
}

impl CategoryPatch {
    pub(crate) fn apply_to(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            category.description = description.clone();
        }
        if let Some(color) = &self.color {
            category.color = color.clone();
        }
        if let Some(icon) = &self.icon {
            category.icon = icon.clone();
        }
        if let Some(order) = self.order {
            category.order = order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, CategoryPatch};

    #[test]
    fn default_category_is_valid_and_reserved() {
        let category = Category::default_category(1);
        assert!(category.is_default());
        assert_eq!(category.name, "General");
        category.validate().unwrap();
    }

    #[test]
    fn validate_rejects_malformed_color() {
        let mut category = Category::default_category(1);
        category.color = Some("blue".to_string());
        assert!(category.validate().is_err());
    }

    #[test]
    fn patch_trims_name() {
        let mut category = Category::default_category(1);
        CategoryPatch {
            name: Some("  Inbox ".to_string()),
            ..CategoryPatch::default()
        }
        .apply_to(&mut category);
        assert_eq!(category.name, "Inbox");
    }
}

//! Category and tag write use-cases plus default seeding.
//!
//! # Responsibility
//! - Enforce name uniqueness and the reserved default category.
//! - Seed the default category and configured predefined data.
//!
//! # Invariants
//! - The default category is never deleted.
//! - Deleting a category moves its notes to the default category in the same
//!   unit of work.
//! - Tag names are stored normalized (trimmed, lowercase).
//! - Tag deletion removes relation rows before the tag itself.

use crate::backend::{Field, FieldValue, Predicate, ScanQuery, StorageBackend, StorageOps};
use crate::clock::{next_updated_at, now_ms};
use crate::error::{StoreError, StoreResult};
use crate::model::{
    normalize_tag_name, normalize_tag_names, Category, CategoryDraft, CategoryPatch, EntityKind,
    ModelValidationError, Record, Tag, TagDraft, TagPatch, DEFAULT_CATEGORY_ID,
};
use crate::repo::catalog_repo::{
    find_category_by_name, find_tag_by_name, load_category, load_tag, max_category_order,
};
use crate::repo::relation_repo::cascade_delete_tag;
use uuid::Uuid;

/// Write-side category/tag operations bound to one backend.
pub struct CatalogService<'b> {
    backend: &'b mut dyn StorageBackend,
}

impl<'b> CatalogService<'b> {
    pub fn new(backend: &'b mut dyn StorageBackend) -> Self {
        Self { backend }
    }

    pub fn create_category(&mut self, draft: &CategoryDraft) -> StoreResult<Category> {
        let now = now_ms();
        let mut created = None;
        self.backend.transaction(&mut |ops| {
            created = Some(insert_category(ops, draft, now)?);
            Ok(())
        })?;
        created.ok_or_else(|| StoreError::ConstraintViolation("category was not created".into()))
    }

    pub fn update_category(&mut self, category_id: &str, patch: &CategoryPatch) -> StoreResult<Category> {
        let mut updated = None;
        self.backend.transaction(&mut |ops| {
            let mut category = load_category(&*ops, category_id)?
                .ok_or_else(|| StoreError::not_found(EntityKind::Category, category_id))?;
            patch.apply_to(&mut category);
            if patch.name.is_some() {
                ensure_category_name_free(ops, &category.name, Some(category_id))?;
            }
            ops.put(&Record::Category(category.clone()))?;
            updated = Some(category);
            Ok(())
        })?;
        updated.ok_or_else(|| StoreError::not_found(EntityKind::Category, category_id))
    }

    /// Deletes a category; its notes move to the default category.
    ///
    /// Returns the number of reassigned notes, or `None` when the category
    /// did not exist.
    pub fn delete_category(&mut self, category_id: &str) -> StoreResult<Option<usize>> {
        if category_id == DEFAULT_CATEGORY_ID {
            return Err(StoreError::ConstraintViolation(
                "the default category cannot be deleted".to_string(),
            ));
        }

        let now = now_ms();
        let mut reassigned = None;
        self.backend.transaction(&mut |ops| {
            if ops.get(EntityKind::Category, category_id)?.is_none() {
                return Ok(());
            }
            let query = ScanQuery::all(EntityKind::Note)
                .filter(Predicate::Eq(Field::CategoryId, FieldValue::text(category_id)));
            let notes: Vec<_> = ops
                .scan(&query)?
                .into_iter()
                .filter_map(Record::into_note)
                .collect();
            let count = notes.len();
            for mut note in notes {
                note.category_id = None;
                note.updated_at = next_updated_at(now, note.updated_at, note.created_at);
                ops.put(&Record::Note(note))?;
            }
            ops.delete(EntityKind::Category, category_id)?;
            reassigned = Some(count);
            Ok(())
        })?;
        Ok(reassigned)
    }

    pub fn create_tag(&mut self, draft: &TagDraft) -> StoreResult<Tag> {
        let now = now_ms();
        let mut created = None;
        self.backend.transaction(&mut |ops| {
            created = Some(insert_tag(ops, draft, now)?);
            Ok(())
        })?;
        created.ok_or_else(|| StoreError::ConstraintViolation("tag was not created".into()))
    }

    pub fn update_tag(&mut self, tag_id: &str, patch: &TagPatch) -> StoreResult<Tag> {
        let mut updated = None;
        self.backend.transaction(&mut |ops| {
            let mut tag = load_tag(&*ops, tag_id)?
                .ok_or_else(|| StoreError::not_found(EntityKind::Tag, tag_id))?;
            if let Some(name) = &patch.name {
                let name = normalize_tag_name(name)
                    .ok_or(ModelValidationError::BlankName("tag.name"))?;
                ensure_tag_name_free(ops, &name, Some(tag_id))?;
                tag.name = name;
            }
            if let Some(color) = &patch.color {
                tag.color = color.clone();
            }
            ops.put(&Record::Tag(tag.clone()))?;
            updated = Some(tag);
            Ok(())
        })?;
        updated.ok_or_else(|| StoreError::not_found(EntityKind::Tag, tag_id))
    }

    /// Deletes a tag and its relation rows.
    ///
    /// Returns the number of detached notes, or `None` when the tag did not
    /// exist.
    pub fn delete_tag(&mut self, tag_id: &str) -> StoreResult<Option<usize>> {
        let mut detached = None;
        self.backend.transaction(&mut |ops| {
            if ops.get(EntityKind::Tag, tag_id)?.is_none() {
                return Ok(());
            }
            let count = cascade_delete_tag(ops, tag_id)?;
            ops.delete(EntityKind::Tag, tag_id)?;
            detached = Some(count);
            Ok(())
        })?;
        Ok(detached)
    }

    /// Creates the default category and seed data on a fresh store.
    ///
    /// Returns whether anything was seeded.
    pub fn seed_defaults(
        &mut self,
        categories: &[CategoryDraft],
        tags: &[TagDraft],
    ) -> StoreResult<bool> {
        let now = now_ms();
        let mut seeded = false;
        self.backend.transaction(&mut |ops| {
            seeded = seed_defaults_in(ops, categories, tags, now)?;
            Ok(())
        })?;
        Ok(seeded)
    }
}

/// Seeds inside an open unit of work. Does nothing when the default
/// category already exists.
pub(crate) fn seed_defaults_in(
    ops: &mut dyn StorageOps,
    categories: &[CategoryDraft],
    tags: &[TagDraft],
    now: i64,
) -> StoreResult<bool> {
    if ops.get(EntityKind::Category, DEFAULT_CATEGORY_ID)?.is_some() {
        return Ok(false);
    }

    ops.put(&Record::Category(Category::default_category(now)))?;
    for draft in categories {
        if find_category_by_name(&*ops, &draft.name)?.is_none() {
            insert_category(ops, draft, now)?;
        }
    }
    for draft in tags {
        let exists = match normalize_tag_name(&draft.name) {
            Some(name) => find_tag_by_name(&*ops, &name)?.is_some(),
            None => true,
        };
        if !exists {
            insert_tag(ops, draft, now)?;
        }
    }
    Ok(true)
}

/// Resolves tag names to ids, creating missing tags.
pub(crate) fn ensure_tags_by_names(
    ops: &mut dyn StorageOps,
    names: &[String],
    now: i64,
) -> StoreResult<Vec<String>> {
    let mut tag_ids = Vec::new();
    for name in normalize_tag_names(names) {
        let tag = match find_tag_by_name(&*ops, &name)? {
            Some(tag) => tag,
            None => insert_tag(ops, &TagDraft::named(name), now)?,
        };
        tag_ids.push(tag.id);
    }
    Ok(tag_ids)
}

fn insert_category(
    ops: &mut dyn StorageOps,
    draft: &CategoryDraft,
    now: i64,
) -> StoreResult<Category> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(ModelValidationError::BlankName("category.name").into());
    }
    ensure_category_name_free(ops, &name, None)?;

    let id = draft
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if ops.get(EntityKind::Category, &id)?.is_some() {
        return Err(StoreError::ConstraintViolation(format!(
            "category id `{id}` already exists"
        )));
    }

    let order = match draft.order {
        Some(order) => order,
        None => max_category_order(&*ops)?.map_or(0, |order| order + 1),
    };
    let category = Category {
        id,
        name,
        description: draft.description.clone(),
        color: draft.color.clone(),
        icon: draft.icon.clone(),
        created_at: now,
        order,
    };
    ops.put(&Record::Category(category.clone()))?;
    Ok(category)
}

fn insert_tag(ops: &mut dyn StorageOps, draft: &TagDraft, now: i64) -> StoreResult<Tag> {
    let name =
        normalize_tag_name(&draft.name).ok_or(ModelValidationError::BlankName("tag.name"))?;
    ensure_tag_name_free(ops, &name, None)?;

    let id = draft
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if ops.get(EntityKind::Tag, &id)?.is_some() {
        return Err(StoreError::ConstraintViolation(format!(
            "tag id `{id}` already exists"
        )));
    }

    let tag = Tag {
        id,
        name,
        color: draft.color.clone(),
        usage_count: 0,
        created_at: now,
    };
    ops.put(&Record::Tag(tag.clone()))?;
    Ok(tag)
}

fn ensure_category_name_free(
    ops: &mut dyn StorageOps,
    name: &str,
    owner_id: Option<&str>,
) -> StoreResult<()> {
    match find_category_by_name(&*ops, name)? {
        Some(existing) if Some(existing.id.as_str()) != owner_id => Err(
            StoreError::ConstraintViolation(format!("category name `{name}` is already in use")),
        ),
        _ => Ok(()),
    }
}

fn ensure_tag_name_free(
    ops: &mut dyn StorageOps,
    name: &str,
    owner_id: Option<&str>,
) -> StoreResult<()> {
    match find_tag_by_name(&*ops, name)? {
        Some(existing) if Some(existing.id.as_str()) != owner_id => Err(
            StoreError::ConstraintViolation(format!("tag name `{name}` is already in use")),
        ),
        _ => Ok(()),
    }
}

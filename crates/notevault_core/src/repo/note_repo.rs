//! Note read paths over any storage backend.
//!
//! # Responsibility
//! - Translate note list filters into structured scan queries.
//! - Resolve the all-of tag filter through the relation rows.
//! - Return notes with `tag_ids` hydrated.
//!
//! # Invariants
//! - Default ordering is `updated_at DESC`, ties by id ascending.
//! - Filtering and paging produce identical results on both backends.

use super::relation_repo::{hydrate_tags, note_ids_with_all_tags};
use crate::backend::{
    BackendResult, Field, FieldValue, OrderBy, Predicate, ScanQuery, StorageRead,
};
use crate::model::{EntityKind, Note, Priority, Record};
use std::collections::HashMap;

/// Attribute filter for note listings. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    /// `"default"` also matches notes without a category.
    pub category_id: Option<String>,
    /// Notes must carry every listed tag.
    pub tag_ids: Vec<String>,
    pub is_favorite: Option<bool>,
    pub is_archived: Option<bool>,
    pub priority: Option<Priority>,
    /// Exclusive lower bound on `created_at`.
    pub created_after: Option<i64>,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<i64>,
}

impl NoteFilter {
    pub fn in_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_tag(mut self, tag_id: impl Into<String>) -> Self {
        self.tag_ids.push(tag_id.into());
        self
    }

    pub fn favorite(mut self, value: bool) -> Self {
        self.is_favorite = Some(value);
        self
    }

    pub fn archived(mut self, value: bool) -> Self {
        self.is_archived = Some(value);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn created_after(mut self, epoch_ms: i64) -> Self {
        self.created_after = Some(epoch_ms);
        self
    }

    pub fn created_before(mut self, epoch_ms: i64) -> Self {
        self.created_before = Some(epoch_ms);
        self
    }

    fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(category_id) = &self.category_id {
            predicates.push(Predicate::Eq(
                Field::CategoryId,
                FieldValue::text(category_id.as_str()),
            ));
        }
        if let Some(value) = self.is_favorite {
            predicates.push(Predicate::Eq(Field::IsFavorite, FieldValue::Bool(value)));
        }
        if let Some(value) = self.is_archived {
            predicates.push(Predicate::Eq(Field::IsArchived, FieldValue::Bool(value)));
        }
        if let Some(priority) = self.priority {
            predicates.push(Predicate::Eq(
                Field::Priority,
                FieldValue::Int(priority.ordinal()),
            ));
        }
        if let Some(bound) = self.created_after {
            predicates.push(Predicate::After(Field::CreatedAt, bound));
        }
        if let Some(bound) = self.created_before {
            predicates.push(Predicate::Before(Field::CreatedAt, bound));
        }
        predicates
    }
}

/// Filter + ordering + paging for note listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteListQuery {
    pub filter: NoteFilter,
    /// `None` orders by `updated_at` descending.
    pub order: Option<OrderBy>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl NoteListQuery {
    pub fn filtered(filter: NoteFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }
}

/// Loads one note with its tag ids.
pub fn load_note<R>(store: &R, note_id: &str) -> BackendResult<Option<Note>>
where
    R: StorageRead + ?Sized,
{
    let Some(note) = store
        .get(EntityKind::Note, note_id)?
        .and_then(Record::into_note)
    else {
        return Ok(None);
    };
    let mut notes = [note];
    hydrate_tags(store, &mut notes)?;
    let [note] = notes;
    Ok(Some(note))
}

/// Lists notes matching `query`.
pub fn list_notes<R>(store: &R, query: &NoteListQuery) -> BackendResult<Vec<Note>>
where
    R: StorageRead + ?Sized,
{
    let mut scan = ScanQuery::all(EntityKind::Note);
    scan.predicates = query.filter.predicates();

    if !query.filter.tag_ids.is_empty() {
        let note_ids = note_ids_with_all_tags(store, &query.filter.tag_ids)?;
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }
        scan.predicates.push(Predicate::In(
            Field::Id,
            note_ids.into_iter().map(FieldValue::Text).collect(),
        ));
    }

    scan.order = Some(query.order.unwrap_or(OrderBy::desc(Field::UpdatedAt)));
    scan.limit = query.limit;
    scan.offset = query.offset;

    let mut notes: Vec<Note> = store
        .scan(&scan)?
        .into_iter()
        .filter_map(Record::into_note)
        .collect();
    hydrate_tags(store, &mut notes)?;
    Ok(notes)
}

/// Loads notes by id, keeping the order of `note_ids`. Missing ids are skipped.
pub fn load_notes_in_order<R>(store: &R, note_ids: &[String]) -> BackendResult<Vec<Note>>
where
    R: StorageRead + ?Sized,
{
    if note_ids.is_empty() {
        return Ok(Vec::new());
    }

    let scan = ScanQuery::all(EntityKind::Note).filter(Predicate::In(
        Field::Id,
        note_ids.iter().map(FieldValue::text).collect(),
    ));
    let mut by_id: HashMap<String, Note> = store
        .scan(&scan)?
        .into_iter()
        .filter_map(Record::into_note)
        .map(|note| (note.id.clone(), note))
        .collect();

    let mut notes: Vec<Note> = note_ids.iter().filter_map(|id| by_id.remove(id)).collect();
    hydrate_tags(store, &mut notes)?;
    Ok(notes)
}

/// Every note ordered by `updated_at` descending, tags hydrated.
pub fn all_notes_recent_first<R>(store: &R, include_archived: bool) -> BackendResult<Vec<Note>>
where
    R: StorageRead + ?Sized,
{
    let mut scan = ScanQuery::all(EntityKind::Note).order_by(OrderBy::desc(Field::UpdatedAt));
    if !include_archived {
        scan = scan.filter(Predicate::Eq(Field::IsArchived, FieldValue::Bool(false)));
    }
    let mut notes: Vec<Note> = store
        .scan(&scan)?
        .into_iter()
        .filter_map(Record::into_note)
        .collect();
    hydrate_tags(store, &mut notes)?;
    Ok(notes)
}

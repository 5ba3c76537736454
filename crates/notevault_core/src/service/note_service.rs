//! Note write use-cases.
//!
//! # Responsibility
//! - Create, patch and delete notes as single units of work.
//! - Route every tag change through the relation manager.
//!
//! # Invariants
//! - `updated_at` is assigned here on every mutation and never regresses.
//! - A non-null `category_id` references an existing category.
//! - Deleting a note removes its relation rows first, so tag counters stay
//!   exact.

use crate::backend::{StorageBackend, StorageOps};
use crate::clock::{next_updated_at, now_ms};
use crate::error::{StoreError, StoreResult};
use crate::model::{EntityKind, Note, NoteDraft, NotePatch, Record, SyncStatus};
use crate::repo::note_repo::load_note;
use crate::repo::relation_repo::{cascade_delete_note, set_tags, TagDiff};
use crate::service::catalog_service::ensure_tags_by_names;
use uuid::Uuid;

/// Write-side note operations bound to one backend.
pub struct NoteService<'b> {
    backend: &'b mut dyn StorageBackend,
}

impl<'b> NoteService<'b> {
    pub fn new(backend: &'b mut dyn StorageBackend) -> Self {
        Self { backend }
    }

    /// Creates a note with a generated id and returns it with tags hydrated.
    pub fn create_note(&mut self, draft: &NoteDraft) -> StoreResult<Note> {
        let now = now_ms();
        let note = Note {
            id: Uuid::new_v4().to_string(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            category_id: draft.category_id.clone(),
            tag_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            is_favorite: draft.is_favorite,
            is_archived: draft.is_archived,
            priority: draft.priority,
            remind_at: draft.remind_at,
            encrypted: draft.encrypted,
            sync_status: SyncStatus::Unsynced,
            last_synced_at: None,
        };

        let mut created = None;
        self.backend.transaction(&mut |ops| {
            ensure_category_exists(ops, note.category_id.as_deref())?;
            ops.put(&Record::Note(note.clone()))?;
            if !draft.tag_ids.is_empty() {
                set_tags(ops, &note.id, &draft.tag_ids)?;
            }
            created = load_note(&*ops, &note.id)?;
            Ok(())
        })?;
        created.ok_or_else(|| StoreError::not_found(EntityKind::Note, note.id))
    }

    /// Applies `patch` to an existing note.
    pub fn update_note(&mut self, note_id: &str, patch: &NotePatch) -> StoreResult<Note> {
        let now = now_ms();
        let mut updated = None;
        self.backend.transaction(&mut |ops| {
            let mut note = ops
                .get(EntityKind::Note, note_id)?
                .and_then(Record::into_note)
                .ok_or_else(|| StoreError::not_found(EntityKind::Note, note_id))?;

            patch.apply_to(&mut note);
            if patch.category_id.is_some() {
                ensure_category_exists(ops, note.category_id.as_deref())?;
            }
            note.updated_at = next_updated_at(now, note.updated_at, note.created_at);
            ops.put(&Record::Note(note))?;

            if let Some(tag_ids) = &patch.tag_ids {
                set_tags(ops, note_id, tag_ids)?;
            }
            updated = load_note(&*ops, note_id)?;
            Ok(())
        })?;
        updated.ok_or_else(|| StoreError::not_found(EntityKind::Note, note_id))
    }

    /// Deletes a note and its relation rows. Returns whether it existed.
    pub fn delete_note(&mut self, note_id: &str) -> StoreResult<bool> {
        let mut existed = false;
        self.backend.transaction(&mut |ops| {
            if ops.get(EntityKind::Note, note_id)?.is_none() {
                return Ok(());
            }
            cascade_delete_note(ops, note_id)?;
            ops.delete(EntityKind::Note, note_id)?;
            existed = true;
            Ok(())
        })?;
        Ok(existed)
    }

    /// Replaces the note's tag set by id.
    pub fn set_note_tags(&mut self, note_id: &str, tag_ids: &[String]) -> StoreResult<(Note, TagDiff)> {
        let now = now_ms();
        let mut outcome = None;
        self.backend.transaction(&mut |ops| {
            let diff = set_tags(ops, note_id, tag_ids)?;
            if !diff.is_empty() {
                touch_note(ops, note_id, now)?;
            }
            if let Some(note) = load_note(&*ops, note_id)? {
                outcome = Some((note, diff));
            }
            Ok(())
        })?;
        outcome.ok_or_else(|| StoreError::not_found(EntityKind::Note, note_id))
    }

    /// Replaces the note's tag set by name, creating missing tags.
    pub fn tag_note_by_names(&mut self, note_id: &str, names: &[String]) -> StoreResult<(Note, TagDiff)> {
        let now = now_ms();
        let mut outcome = None;
        self.backend.transaction(&mut |ops| {
            if ops.get(EntityKind::Note, note_id)?.is_none() {
                return Err(StoreError::not_found(EntityKind::Note, note_id));
            }
            let tag_ids = ensure_tags_by_names(ops, names, now)?;
            let diff = set_tags(ops, note_id, &tag_ids)?;
            if !diff.is_empty() {
                touch_note(ops, note_id, now)?;
            }
            if let Some(note) = load_note(&*ops, note_id)? {
                outcome = Some((note, diff));
            }
            Ok(())
        })?;
        outcome.ok_or_else(|| StoreError::not_found(EntityKind::Note, note_id))
    }
}

fn touch_note(ops: &mut dyn StorageOps, note_id: &str, now: i64) -> StoreResult<()> {
    let Some(mut note) = ops
        .get(EntityKind::Note, note_id)?
        .and_then(Record::into_note)
    else {
        return Err(StoreError::not_found(EntityKind::Note, note_id));
    };
    note.updated_at = next_updated_at(now, note.updated_at, note.created_at);
    ops.put(&Record::Note(note))?;
    Ok(())
}

pub(crate) fn ensure_category_exists(
    ops: &mut dyn StorageOps,
    category_id: Option<&str>,
) -> StoreResult<()> {
    let Some(category_id) = category_id else {
        return Ok(());
    };
    if ops.get(EntityKind::Category, category_id)?.is_none() {
        return Err(StoreError::not_found(EntityKind::Category, category_id));
    }
    Ok(())
}

//! Note↔tag relation management.
//!
//! # Responsibility
//! - Replace a note's tag set by diffing against stored relation rows.
//! - Cascade relation cleanup when notes or tags are deleted.
//! - Hydrate `Note::tag_ids` for every read path.
//!
//! # Invariants
//! - This module is the only writer of `Tag::usage_count`.
//! - After every write here, a tag's `usage_count` equals the number of
//!   relation rows referencing it.
//! - Writes run on a `StorageOps` handle, i.e. inside the caller's unit of work.

use crate::backend::{Field, FieldValue, Predicate, ScanQuery, StorageOps, StorageRead};
use crate::backend::BackendResult;
use crate::error::{StoreError, StoreResult};
use crate::model::{relation_key, EntityKind, Note, NoteTag, Record, Tag};
use std::collections::{BTreeMap, BTreeSet};

/// Relation rows added and removed by one `set_tags` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Relation rows of one note, ordered by tag id.
pub fn relations_for_note<R>(store: &R, note_id: &str) -> BackendResult<Vec<NoteTag>>
where
    R: StorageRead + ?Sized,
{
    let query = ScanQuery::all(EntityKind::NoteTag)
        .filter(Predicate::Eq(Field::NoteId, FieldValue::text(note_id)));
    Ok(store
        .scan(&query)?
        .into_iter()
        .filter_map(Record::into_relation)
        .collect())
}

/// Relation rows referencing one tag.
pub fn relations_for_tag<R>(store: &R, tag_id: &str) -> BackendResult<Vec<NoteTag>>
where
    R: StorageRead + ?Sized,
{
    let query = ScanQuery::all(EntityKind::NoteTag)
        .filter(Predicate::Eq(Field::TagId, FieldValue::text(tag_id)));
    Ok(store
        .scan(&query)?
        .into_iter()
        .filter_map(Record::into_relation)
        .collect())
}

/// Sorted tag ids joined to `note_id`.
pub fn tag_ids_for_note<R>(store: &R, note_id: &str) -> BackendResult<Vec<String>>
where
    R: StorageRead + ?Sized,
{
    Ok(relations_for_note(store, note_id)?
        .into_iter()
        .map(|relation| relation.tag_id)
        .collect())
}

/// Sorted tag ids per note for a batch of notes.
pub fn tag_ids_for_notes<R>(
    store: &R,
    note_ids: &[String],
) -> BackendResult<BTreeMap<String, Vec<String>>>
where
    R: StorageRead + ?Sized,
{
    let mut by_note: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if note_ids.is_empty() {
        return Ok(by_note);
    }

    let query = ScanQuery::all(EntityKind::NoteTag).filter(Predicate::In(
        Field::NoteId,
        note_ids.iter().map(FieldValue::text).collect(),
    ));
    for relation in store
        .scan(&query)?
        .into_iter()
        .filter_map(Record::into_relation)
    {
        by_note
            .entry(relation.note_id)
            .or_default()
            .push(relation.tag_id);
    }
    Ok(by_note)
}

/// Fills `tag_ids` of every note from relation rows.
pub fn hydrate_tags<R>(store: &R, notes: &mut [Note]) -> BackendResult<()>
where
    R: StorageRead + ?Sized,
{
    if notes.is_empty() {
        return Ok(());
    }
    let note_ids: Vec<String> = notes.iter().map(|note| note.id.clone()).collect();
    let mut by_note = tag_ids_for_notes(store, &note_ids)?;
    for note in notes.iter_mut() {
        note.tag_ids = by_note.remove(&note.id).unwrap_or_default();
    }
    Ok(())
}

/// Ids of notes carrying every tag in `tag_ids`.
///
/// An empty `tag_ids` slice yields an empty set; callers treat "no tag
/// filter" separately.
pub fn note_ids_with_all_tags<R>(store: &R, tag_ids: &[String]) -> BackendResult<BTreeSet<String>>
where
    R: StorageRead + ?Sized,
{
    let unique: BTreeSet<&String> = tag_ids.iter().collect();
    let mut matching: Option<BTreeSet<String>> = None;
    for tag_id in unique {
        let note_ids: BTreeSet<String> = relations_for_tag(store, tag_id)?
            .into_iter()
            .map(|relation| relation.note_id)
            .collect();
        let narrowed = match matching {
            Some(current) => current.intersection(&note_ids).cloned().collect(),
            None => note_ids,
        };
        if narrowed.is_empty() {
            return Ok(narrowed);
        }
        matching = Some(narrowed);
    }
    Ok(matching.unwrap_or_default())
}

/// Replaces the tag set of `note_id` with `tag_ids`.
///
/// Duplicates in `tag_ids` collapse. Unknown notes or tags fail with
/// `NotFound` before anything is written.
pub fn set_tags(ops: &mut dyn StorageOps, note_id: &str, tag_ids: &[String]) -> StoreResult<TagDiff> {
    if ops.get(EntityKind::Note, note_id)?.is_none() {
        return Err(StoreError::not_found(EntityKind::Note, note_id));
    }

    let wanted: BTreeSet<String> = tag_ids.iter().cloned().collect();
    let current: BTreeSet<String> = tag_ids_for_note(&*ops, note_id)?.into_iter().collect();

    let added: Vec<String> = wanted.difference(&current).cloned().collect();
    let removed: Vec<String> = current.difference(&wanted).cloned().collect();
    for tag_id in &added {
        if ops.get(EntityKind::Tag, tag_id)?.is_none() {
            return Err(StoreError::not_found(EntityKind::Tag, tag_id.as_str()));
        }
    }

    for tag_id in &removed {
        ops.delete(EntityKind::NoteTag, &relation_key(note_id, tag_id))?;
        adjust_usage(ops, tag_id, -1)?;
    }
    for tag_id in &added {
        ops.put(&Record::NoteTag(NoteTag::new(note_id, tag_id.as_str())))?;
        adjust_usage(ops, tag_id, 1)?;
    }

    Ok(TagDiff { added, removed })
}

/// Removes every relation row of `note_id`, decrementing the affected tags.
///
/// Returns the number of removed rows.
pub fn cascade_delete_note(ops: &mut dyn StorageOps, note_id: &str) -> StoreResult<usize> {
    let relations = relations_for_note(&*ops, note_id)?;
    for relation in &relations {
        ops.delete(EntityKind::NoteTag, &relation.key())?;
        adjust_usage(ops, &relation.tag_id, -1)?;
    }
    Ok(relations.len())
}

/// Removes every relation row of `tag_id`. No other tag's counter changes.
pub fn cascade_delete_tag(ops: &mut dyn StorageOps, tag_id: &str) -> StoreResult<usize> {
    let relations = relations_for_tag(&*ops, tag_id)?;
    for relation in &relations {
        ops.delete(EntityKind::NoteTag, &relation.key())?;
    }
    Ok(relations.len())
}

/// Recomputes every tag's `usage_count` from relation rows.
///
/// Returns the number of tags whose counter changed.
pub fn recount_usage(ops: &mut dyn StorageOps) -> StoreResult<usize> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for relation in ops
        .scan(&ScanQuery::all(EntityKind::NoteTag))?
        .into_iter()
        .filter_map(Record::into_relation)
    {
        *counts.entry(relation.tag_id).or_default() += 1;
    }

    let tags: Vec<Tag> = ops
        .scan(&ScanQuery::all(EntityKind::Tag))?
        .into_iter()
        .filter_map(Record::into_tag)
        .collect();
    let mut changed = 0;
    for mut tag in tags {
        let actual = counts.get(&tag.id).copied().unwrap_or_default();
        if tag.usage_count != actual {
            tag.usage_count = actual;
            ops.put(&Record::Tag(tag))?;
            changed += 1;
        }
    }
    Ok(changed)
}

fn adjust_usage(ops: &mut dyn StorageOps, tag_id: &str, delta: i64) -> StoreResult<()> {
    let Some(mut tag) = ops
        .get(EntityKind::Tag, tag_id)?
        .and_then(Record::into_tag)
    else {
        return Ok(());
    };
    tag.usage_count = tag.usage_count.saturating_add_signed(delta);
    ops.put(&Record::Tag(tag))?;
    Ok(())
}

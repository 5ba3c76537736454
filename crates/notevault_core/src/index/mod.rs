//! Secondary index emulation for backends without native indexes.
//!
//! # Responsibility
//! - Maintain value→key-set mappings for notes and note/tag relations.
//! - Plan scans: intersect indexed candidate sets, smallest first, and hand
//!   back the residual predicates for a final linear filter.
//!
//! # Invariants
//! - Index updates happen in the same unit of work as the record write.
//! - Indexes are derived state: rebuilding from records yields the same sets.

mod key_set;
mod note_index;
mod relation_index;

use crate::backend::query::{Field, FieldValue, Predicate};
use crate::model::{EntityKind, Record};
use std::collections::BTreeSet;

pub use key_set::KeySetIndex;
pub use note_index::NoteIndex;
pub use relation_index::RelationIndex;

/// Result of index planning for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan<'q> {
    /// Candidate keys, or `None` when no predicate was indexable.
    pub candidates: Option<BTreeSet<String>>,
    /// Predicates the caller still has to evaluate per record.
    pub residual: Vec<&'q Predicate>,
}

/// Owner of every emulated secondary index.
#[derive(Debug, Clone, Default)]
pub struct IndexManager {
    notes: NoteIndex,
    relations: RelationIndex,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces index entries of `previous` (if any) with those of `current`.
    pub fn on_put(&mut self, previous: Option<&Record>, current: &Record) {
        if let Some(previous) = previous {
            self.on_delete(previous);
        }
        match current {
            Record::Note(note) => self.notes.insert(note),
            Record::NoteTag(relation) => self.relations.insert(relation),
            Record::Category(_) | Record::Tag(_) => {}
        }
    }

    /// Drops every index entry of `previous`.
    pub fn on_delete(&mut self, previous: &Record) {
        match previous {
            Record::Note(note) => self.notes.remove(note),
            Record::NoteTag(relation) => self.relations.remove(relation),
            Record::Category(_) | Record::Tag(_) => {}
        }
    }

    /// Builds candidate keys for `predicates` over `kind`.
    ///
    /// Indexed predicates are resolved to key sets and intersected smallest
    /// first; everything else is returned as residual.
    pub fn plan<'q>(&self, kind: EntityKind, predicates: &'q [Predicate]) -> ScanPlan<'q> {
        let mut sets: Vec<BTreeSet<String>> = Vec::new();
        let mut residual = Vec::new();

        for predicate in predicates {
            match self.lookup(kind, predicate) {
                Some(set) => sets.push(set),
                None => residual.push(predicate),
            }
        }

        if sets.is_empty() {
            return ScanPlan {
                candidates: None,
                residual,
            };
        }

        sets.sort_by_key(BTreeSet::len);
        let mut iter = sets.into_iter();
        let mut candidates = iter.next().unwrap_or_default();
        for set in iter {
            if candidates.is_empty() {
                break;
            }
            candidates.retain(|key| set.contains(key));
        }

        ScanPlan {
            candidates: Some(candidates),
            residual,
        }
    }

    fn lookup(&self, kind: EntityKind, predicate: &Predicate) -> Option<BTreeSet<String>> {
        if let Some(keys) = primary_key_lookup(kind, predicate) {
            return Some(keys);
        }
        match kind {
            EntityKind::Note => self.notes.lookup(predicate),
            EntityKind::NoteTag => self.relations.lookup(predicate),
            EntityKind::Category | EntityKind::Tag => None,
        }
    }
}

fn primary_key_lookup(kind: EntityKind, predicate: &Predicate) -> Option<BTreeSet<String>> {
    if kind == EntityKind::NoteTag {
        return None;
    }
    match predicate {
        Predicate::Eq(Field::Id, FieldValue::Text(key)) => Some(BTreeSet::from([key.clone()])),
        Predicate::In(Field::Id, values) => Some(
            values
                .iter()
                .filter_map(|value| match value {
                    FieldValue::Text(key) => Some(key.clone()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

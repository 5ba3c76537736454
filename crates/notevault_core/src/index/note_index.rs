//! Note secondary indexes: category, favorite, archive, priority, creation time.

use super::KeySetIndex;
use crate::backend::query::{Field, FieldValue, Predicate};
use crate::model::Note;
use std::collections::BTreeSet;
use std::ops::Bound;

#[derive(Debug, Clone, Default)]
pub struct NoteIndex {
    by_category: KeySetIndex<String>,
    by_favorite: KeySetIndex<bool>,
    by_archived: KeySetIndex<bool>,
    by_priority: KeySetIndex<i64>,
    by_created: BTreeSet<(i64, String)>,
}

impl NoteIndex {
    pub fn insert(&mut self, note: &Note) {
        let key = note.id.as_str();
        self.by_category
            .insert(note.effective_category_id().to_string(), key);
        self.by_favorite.insert(note.is_favorite, key);
        self.by_archived.insert(note.is_archived, key);
        self.by_priority.insert(note.priority.ordinal(), key);
        self.by_created.insert((note.created_at, note.id.clone()));
    }

    pub fn remove(&mut self, note: &Note) {
        let key = note.id.as_str();
        self.by_category
            .remove(&note.effective_category_id().to_string(), key);
        self.by_favorite.remove(&note.is_favorite, key);
        self.by_archived.remove(&note.is_archived, key);
        self.by_priority.remove(&note.priority.ordinal(), key);
        self.by_created.remove(&(note.created_at, note.id.clone()));
    }

    /// Resolves one predicate to candidate keys, or `None` if not indexed.
    pub fn lookup(&self, predicate: &Predicate) -> Option<BTreeSet<String>> {
        match predicate {
            Predicate::Eq(field, value) => self.lookup_any(*field, std::slice::from_ref(value)),
            Predicate::In(field, values) => self.lookup_any(*field, values),
            Predicate::After(Field::CreatedAt, bound) => Some(match bound.checked_add(1) {
                Some(lower) => self.created_range(
                    Bound::Included((lower, String::new())),
                    Bound::Unbounded,
                ),
                None => BTreeSet::new(),
            }),
            // `(t, "")` sorts before every `(t, id)`, so this excludes `t` itself.
            Predicate::Before(Field::CreatedAt, bound) => Some(self.created_range(
                Bound::Unbounded,
                Bound::Excluded((*bound, String::new())),
            )),
            _ => None,
        }
    }

    fn lookup_any(&self, field: Field, values: &[FieldValue]) -> Option<BTreeSet<String>> {
        match field {
            Field::CategoryId => {
                let keys: Vec<String> = text_values(values)?;
                Some(self.by_category.keys_for_any(keys.iter()))
            }
            Field::IsFavorite => {
                let flags = bool_values(values)?;
                Some(self.by_favorite.keys_for_any(flags.iter()))
            }
            Field::IsArchived => {
                let flags = bool_values(values)?;
                Some(self.by_archived.keys_for_any(flags.iter()))
            }
            Field::Priority => {
                let ordinals = int_values(values)?;
                Some(self.by_priority.keys_for_any(ordinals.iter()))
            }
            _ => None,
        }
    }

    fn created_range(
        &self,
        lower: Bound<(i64, String)>,
        upper: Bound<(i64, String)>,
    ) -> BTreeSet<String> {
        self.by_created
            .range((lower, upper))
            .map(|(_, key)| key.clone())
            .collect()
    }
}

// Values of the wrong type make the predicate unindexable; the scan then
// falls back to linear evaluation, which rejects them.
fn text_values(values: &[FieldValue]) -> Option<Vec<String>> {
    values
        .iter()
        .map(|value| match value {
            FieldValue::Text(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn bool_values(values: &[FieldValue]) -> Option<Vec<bool>> {
    values
        .iter()
        .map(|value| match value {
            FieldValue::Bool(flag) => Some(*flag),
            _ => None,
        })
        .collect()
}

fn int_values(values: &[FieldValue]) -> Option<Vec<i64>> {
    values
        .iter()
        .map(|value| match value {
            FieldValue::Int(number) => Some(*number),
            _ => None,
        })
        .collect()
}

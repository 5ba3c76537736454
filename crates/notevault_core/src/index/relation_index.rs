//! Note/tag relation lookups by either side.

use super::KeySetIndex;
use crate::backend::query::{Field, FieldValue, Predicate};
use crate::model::NoteTag;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    by_note: KeySetIndex<String>,
    by_tag: KeySetIndex<String>,
}

impl RelationIndex {
    pub fn insert(&mut self, relation: &NoteTag) {
        let key = relation.key();
        self.by_note.insert(relation.note_id.clone(), &key);
        self.by_tag.insert(relation.tag_id.clone(), &key);
    }

    pub fn remove(&mut self, relation: &NoteTag) {
        let key = relation.key();
        self.by_note.remove(&relation.note_id, &key);
        self.by_tag.remove(&relation.tag_id, &key);
    }

    pub fn lookup(&self, predicate: &Predicate) -> Option<BTreeSet<String>> {
        let (field, values) = match predicate {
            Predicate::Eq(field, value) => (*field, std::slice::from_ref(value)),
            Predicate::In(field, values) => (*field, values.as_slice()),
            _ => return None,
        };
        let index = match field {
            Field::NoteId => &self.by_note,
            Field::TagId => &self.by_tag,
            _ => return None,
        };
        let keys = values
            .iter()
            .map(|value| match value {
                FieldValue::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect::<Option<Vec<String>>>()?;
        Some(index.keys_for_any(keys.iter()))
    }
}

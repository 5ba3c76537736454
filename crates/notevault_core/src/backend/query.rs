//! Structured scan queries shared by both backends.
//!
//! # Responsibility
//! - Describe filters, ordering and paging without backend-specific syntax.
//! - Provide in-memory evaluation used by the object store.
//!
//! # Invariants
//! - Predicates are AND-combined.
//! - `Name` equality is ASCII case-insensitive (mirrors `COLLATE NOCASE`).
//! - Ordering ties break by primary key ascending on every backend.
//! - A field that does not apply to a record kind never matches.

use crate::model::{EntityKind, Record};
use std::cmp::Ordering;

/// Addressable record attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Title,
    /// Note category with `None` resolved to the default category.
    CategoryId,
    IsFavorite,
    IsArchived,
    /// Priority ordinal.
    Priority,
    CreatedAt,
    UpdatedAt,
    Name,
    /// Category display order.
    Order,
    NoteId,
    TagId,
}

/// Comparable attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

/// One filter term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(Field, FieldValue),
    /// Matches when the field equals any listed value. Empty list never matches.
    In(Field, Vec<FieldValue>),
    /// Strictly greater than.
    After(Field, i64),
    /// Strictly less than.
    Before(Field, i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Sort specification; ties always break by primary key ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: Field,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: Field) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: Field) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

/// Scan request: kind + AND-ed predicates + optional order + paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanQuery {
    pub kind: EntityKind,
    pub predicates: Vec<Predicate>,
    /// `None` orders by primary key ascending.
    pub order: Option<OrderBy>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl ScanQuery {
    pub fn all(kind: EntityKind) -> Self {
        Self {
            kind,
            predicates: Vec::new(),
            order: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

/// Reads one attribute of a record; `None` when the field does not apply.
pub fn record_field(record: &Record, field: Field) -> Option<FieldValue> {
    match (record, field) {
        (Record::Note(note), Field::Id) => Some(FieldValue::text(note.id.as_str())),
        (Record::Note(note), Field::Title) => Some(FieldValue::text(note.title.as_str())),
        (Record::Note(note), Field::CategoryId) => {
            Some(FieldValue::text(note.effective_category_id()))
        }
        (Record::Note(note), Field::IsFavorite) => Some(FieldValue::Bool(note.is_favorite)),
        (Record::Note(note), Field::IsArchived) => Some(FieldValue::Bool(note.is_archived)),
        (Record::Note(note), Field::Priority) => Some(FieldValue::Int(note.priority.ordinal())),
        (Record::Note(note), Field::CreatedAt) => Some(FieldValue::Int(note.created_at)),
        (Record::Note(note), Field::UpdatedAt) => Some(FieldValue::Int(note.updated_at)),
        (Record::Category(category), Field::Id) => Some(FieldValue::text(category.id.as_str())),
        (Record::Category(category), Field::Name) => {
            Some(FieldValue::text(category.name.as_str()))
        }
        (Record::Category(category), Field::CreatedAt) => {
            Some(FieldValue::Int(category.created_at))
        }
        (Record::Category(category), Field::Order) => Some(FieldValue::Int(category.order)),
        (Record::Tag(tag), Field::Id) => Some(FieldValue::text(tag.id.as_str())),
        (Record::Tag(tag), Field::Name) => Some(FieldValue::text(tag.name.as_str())),
        (Record::Tag(tag), Field::CreatedAt) => Some(FieldValue::Int(tag.created_at)),
        (Record::NoteTag(relation), Field::NoteId) => {
            Some(FieldValue::text(relation.note_id.as_str()))
        }
        (Record::NoteTag(relation), Field::TagId) => {
            Some(FieldValue::text(relation.tag_id.as_str()))
        }
        _ => None,
    }
}

/// Evaluates one predicate against a record.
pub fn matches(record: &Record, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq(field, expected) => record_field(record, *field)
            .map(|actual| values_equal(*field, &actual, expected))
            .unwrap_or(false),
        Predicate::In(field, expected) => record_field(record, *field)
            .map(|actual| {
                expected
                    .iter()
                    .any(|value| values_equal(*field, &actual, value))
            })
            .unwrap_or(false),
        Predicate::After(field, bound) => {
            matches!(record_field(record, *field), Some(FieldValue::Int(value)) if value > *bound)
        }
        Predicate::Before(field, bound) => {
            matches!(record_field(record, *field), Some(FieldValue::Int(value)) if value < *bound)
        }
    }
}

/// Evaluates every predicate (AND).
pub fn matches_all<'a>(record: &Record, predicates: impl IntoIterator<Item = &'a Predicate>) -> bool {
    predicates
        .into_iter()
        .all(|predicate| matches(record, predicate))
}

fn values_equal(field: Field, actual: &FieldValue, expected: &FieldValue) -> bool {
    match (field, actual, expected) {
        (Field::Name, FieldValue::Text(left), FieldValue::Text(right)) => {
            left.eq_ignore_ascii_case(right)
        }
        _ => actual == expected,
    }
}

/// Orders two records by `order`, then by primary key.
pub fn compare_records(left: &Record, right: &Record, order: Option<OrderBy>) -> Ordering {
    let primary = order
        .map(|order| {
            let ordering = compare_values(
                record_field(left, order.field).as_ref(),
                record_field(right, order.field).as_ref(),
            );
            match order.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        })
        .unwrap_or(Ordering::Equal);
    primary.then_with(|| left.key().cmp(&right.key()))
}

fn compare_values(left: Option<&FieldValue>, right: Option<&FieldValue>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => value_rank(left)
            .cmp(&value_rank(right))
            .then_with(|| match (left, right) {
                (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
                (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
                (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
                _ => Ordering::Equal,
            }),
        _ => Ordering::Equal,
    }
}

// NULL sorts first, matching SQLite ascending order.
fn value_rank(value: &FieldValue) -> u8 {
    match value {
        FieldValue::Null => 0,
        FieldValue::Bool(_) | FieldValue::Int(_) => 1,
        FieldValue::Text(_) => 2,
    }
}

/// Sorts then applies offset/limit, the way SQL `ORDER BY ... LIMIT ... OFFSET` does.
pub fn order_and_page(mut records: Vec<Record>, query: &ScanQuery) -> Vec<Record> {
    records.sort_by(|left, right| compare_records(left, right, query.order));
    let offset = query.offset as usize;
    let limit = query.limit.map_or(usize::MAX, |limit| limit as usize);
    records.into_iter().skip(offset).take(limit).collect()
}

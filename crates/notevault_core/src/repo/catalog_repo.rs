//! Category and tag read paths.
//!
//! # Invariants
//! - Name lookups are ASCII case-insensitive on every backend.
//! - Category listings are ordered by `order`, then name, then id.
//! - Tag listings are ordered by name.

use crate::backend::{
    BackendResult, Field, FieldValue, OrderBy, Predicate, ScanQuery, StorageRead,
};
use crate::model::{Category, EntityKind, Record, Tag};

pub fn load_category<R>(store: &R, category_id: &str) -> BackendResult<Option<Category>>
where
    R: StorageRead + ?Sized,
{
    Ok(store
        .get(EntityKind::Category, category_id)?
        .and_then(Record::into_category))
}

pub fn list_categories<R>(store: &R) -> BackendResult<Vec<Category>>
where
    R: StorageRead + ?Sized,
{
    let query = ScanQuery::all(EntityKind::Category).order_by(OrderBy::asc(Field::Order));
    let mut categories: Vec<Category> = store
        .scan(&query)?
        .into_iter()
        .filter_map(Record::into_category)
        .collect();
    categories.sort_by(|left, right| {
        left.order
            .cmp(&right.order)
            .then_with(|| left.name.to_lowercase().cmp(&right.name.to_lowercase()))
            .then_with(|| left.id.cmp(&right.id))
    });
    Ok(categories)
}

pub fn find_category_by_name<R>(store: &R, name: &str) -> BackendResult<Option<Category>>
where
    R: StorageRead + ?Sized,
{
    let query = ScanQuery::all(EntityKind::Category)
        .filter(Predicate::Eq(Field::Name, FieldValue::text(name.trim())))
        .limit(1);
    Ok(store
        .scan(&query)?
        .into_iter()
        .find_map(Record::into_category))
}

/// Largest category `order`, or `None` when no category exists.
pub fn max_category_order<R>(store: &R) -> BackendResult<Option<i64>>
where
    R: StorageRead + ?Sized,
{
    let query = ScanQuery::all(EntityKind::Category)
        .order_by(OrderBy::desc(Field::Order))
        .limit(1);
    Ok(store
        .scan(&query)?
        .into_iter()
        .find_map(Record::into_category)
        .map(|category| category.order))
}

pub fn load_tag<R>(store: &R, tag_id: &str) -> BackendResult<Option<Tag>>
where
    R: StorageRead + ?Sized,
{
    Ok(store.get(EntityKind::Tag, tag_id)?.and_then(Record::into_tag))
}

pub fn list_tags<R>(store: &R) -> BackendResult<Vec<Tag>>
where
    R: StorageRead + ?Sized,
{
    let query = ScanQuery::all(EntityKind::Tag).order_by(OrderBy::asc(Field::Name));
    Ok(store
        .scan(&query)?
        .into_iter()
        .filter_map(Record::into_tag)
        .collect())
}

/// Looks a tag up by its normalized name.
pub fn find_tag_by_name<R>(store: &R, name: &str) -> BackendResult<Option<Tag>>
where
    R: StorageRead + ?Sized,
{
    let query = ScanQuery::all(EntityKind::Tag)
        .filter(Predicate::Eq(Field::Name, FieldValue::text(name.trim())))
        .limit(1);
    Ok(store.scan(&query)?.into_iter().find_map(Record::into_tag))
}

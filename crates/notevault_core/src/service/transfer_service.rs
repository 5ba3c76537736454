//! Full-store export and destructive import.
//!
//! # Responsibility
//! - Snapshot every entity into one versioned document.
//! - Validate a document completely, then replace the store with it in one
//!   unit of work.
//!
//! # Invariants
//! - Import is all-or-nothing: a rejected document leaves prior state intact.
//! - Relation rows are the source of truth for tags; note `tagIds` in a
//!   document are merged into the relation set.
//! - Usage counters are recomputed from relations after loading.
//! - The default category exists after every import.

use crate::backend::{BackendError, ScanQuery, StorageBackend, StorageRead};
use crate::clock::now_ms;
use crate::error::{StoreError, StoreResult};
use crate::model::{
    normalize_tag_name, Category, EntityKind, Note, NoteTag, Record, Tag, DEFAULT_CATEGORY_ID,
    DEFAULT_CATEGORY_NAME,
};
use crate::repo::relation_repo::{hydrate_tags, recount_usage};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Document format version written by [`export_document`].
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Full-store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub format_version: u32,
    /// Epoch milliseconds.
    pub exported_at: i64,
    pub notes: Vec<Note>,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub relations: Vec<NoteTag>,
}

/// Counts of records loaded by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub notes: usize,
    pub categories: usize,
    pub tags: usize,
    pub relations: usize,
}

/// Reads every entity in one batch, without holding a transaction open.
pub fn export_document<R>(store: &R) -> StoreResult<ExportDocument>
where
    R: StorageRead + ?Sized,
{
    let categories = scan_kind(store, EntityKind::Category, Record::into_category)?;
    let tags = scan_kind(store, EntityKind::Tag, Record::into_tag)?;
    let mut notes = scan_kind(store, EntityKind::Note, Record::into_note)?;
    hydrate_tags(store, &mut notes)?;
    let relations = scan_kind(store, EntityKind::NoteTag, Record::into_relation)?;

    Ok(ExportDocument {
        format_version: EXPORT_FORMAT_VERSION,
        exported_at: now_ms(),
        notes,
        categories,
        tags,
        relations,
    })
}

/// Pretty-printed JSON form of an export document.
pub fn document_to_json(document: &ExportDocument) -> StoreResult<String> {
    serde_json::to_string_pretty(document).map_err(|err| StoreError::from(BackendError::from(err)))
}

/// Parses an import document. Malformed JSON is an import format error.
pub fn parse_document(text: &str) -> StoreResult<ExportDocument> {
    serde_json::from_str(text).map_err(|err| StoreError::ImportFormat(err.to_string()))
}

/// Validated, normalized import payload.
#[derive(Debug)]
struct ImportPlan {
    categories: Vec<Category>,
    tags: Vec<Tag>,
    notes: Vec<Note>,
    relations: BTreeSet<NoteTag>,
}

/// Replaces the whole store with `document`.
pub fn import_document(
    backend: &mut dyn StorageBackend,
    document: &ExportDocument,
) -> StoreResult<ImportSummary> {
    let plan = validate_document(document)?;
    let now = now_ms();
    let summary = ImportSummary {
        notes: plan.notes.len(),
        categories: plan.categories.len(),
        tags: plan.tags.len(),
        relations: plan.relations.len(),
    };

    backend.transaction(&mut |ops| {
        ops.clear_all()?;
        if !plan
            .categories
            .iter()
            .any(|category| category.id == DEFAULT_CATEGORY_ID)
        {
            ops.put(&Record::Category(Category::default_category(now)))?;
        }
        for category in &plan.categories {
            ops.put(&Record::Category(category.clone()))?;
        }
        for tag in &plan.tags {
            ops.put(&Record::Tag(tag.clone()))?;
        }
        for note in &plan.notes {
            ops.put(&Record::Note(note.clone()))?;
        }
        for relation in &plan.relations {
            ops.put(&Record::NoteTag(relation.clone()))?;
        }
        recount_usage(ops)?;
        Ok(())
    })?;

    Ok(summary)
}

fn validate_document(document: &ExportDocument) -> StoreResult<ImportPlan> {
    if document.format_version != EXPORT_FORMAT_VERSION {
        return Err(StoreError::ImportFormat(format!(
            "unsupported format version {} (expected {EXPORT_FORMAT_VERSION})",
            document.format_version
        )));
    }

    let mut category_ids = HashSet::new();
    let mut category_names = HashSet::new();
    // The re-seeded default category claims its name too.
    if !document
        .categories
        .iter()
        .any(|category| category.id == DEFAULT_CATEGORY_ID)
    {
        category_names.insert(DEFAULT_CATEGORY_NAME.to_ascii_lowercase());
    }
    for category in &document.categories {
        category.validate().map_err(import_error)?;
        if !category_ids.insert(category.id.as_str()) {
            return Err(duplicate("category id", &category.id));
        }
        if !category_names.insert(category.name.trim().to_ascii_lowercase()) {
            return Err(duplicate("category name", &category.name));
        }
    }

    let mut tag_ids = HashSet::new();
    let mut tag_names = HashSet::new();
    let mut tags = Vec::with_capacity(document.tags.len());
    for tag in &document.tags {
        let mut tag = tag.clone();
        tag.name = normalize_tag_name(&tag.name).unwrap_or_default();
        tag.usage_count = 0;
        tag.validate().map_err(import_error)?;
        if !tag_ids.insert(tag.id.clone()) {
            return Err(duplicate("tag id", &tag.id));
        }
        if !tag_names.insert(tag.name.clone()) {
            return Err(duplicate("tag name", &tag.name));
        }
        tags.push(tag);
    }

    let mut note_ids = HashSet::new();
    let mut relations = BTreeSet::new();
    let mut notes = Vec::with_capacity(document.notes.len());
    for note in &document.notes {
        note.validate().map_err(import_error)?;
        if !note_ids.insert(note.id.clone()) {
            return Err(duplicate("note id", &note.id));
        }
        if let Some(category_id) = note.category_id.as_deref() {
            if category_id != DEFAULT_CATEGORY_ID && !category_ids.contains(category_id) {
                return Err(StoreError::ImportFormat(format!(
                    "note {} references unknown category {category_id}",
                    note.id
                )));
            }
        }
        for tag_id in &note.tag_ids {
            relations.insert(NoteTag::new(note.id.as_str(), tag_id.as_str()));
        }
        let mut stored = note.clone();
        stored.tag_ids.clear();
        notes.push(stored);
    }

    relations.extend(document.relations.iter().cloned());
    for relation in &relations {
        relation.validate().map_err(import_error)?;
        if !note_ids.contains(&relation.note_id) {
            return Err(StoreError::ImportFormat(format!(
                "relation references unknown note {}",
                relation.note_id
            )));
        }
        if !tag_ids.contains(&relation.tag_id) {
            return Err(StoreError::ImportFormat(format!(
                "relation references unknown tag {}",
                relation.tag_id
            )));
        }
    }

    Ok(ImportPlan {
        categories: document.categories.clone(),
        tags,
        notes,
        relations,
    })
}

fn scan_kind<R, T>(store: &R, kind: EntityKind, project: fn(Record) -> Option<T>) -> StoreResult<Vec<T>>
where
    R: StorageRead + ?Sized,
{
    Ok(store
        .scan(&ScanQuery::all(kind))?
        .into_iter()
        .filter_map(project)
        .collect())
}

fn import_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::ImportFormat(err.to_string())
}

fn duplicate(what: &str, value: &str) -> StoreError {
    StoreError::ImportFormat(format!("duplicate {what} `{value}`"))
}

#[cfg(test)]
mod tests {
    use super::{parse_document, validate_document, ExportDocument, EXPORT_FORMAT_VERSION};
    use crate::error::StoreError;
    use crate::model::{Category, NoteTag, Tag};

    fn empty_document() -> ExportDocument {
        ExportDocument {
            format_version: EXPORT_FORMAT_VERSION,
            exported_at: 1,
            notes: Vec::new(),
            categories: vec![Category::default_category(1)],
            tags: Vec::new(),
            relations: Vec::new(),
        }
    }

    #[test]
    fn rejects_unknown_format_version() {
        let mut document = empty_document();
        document.format_version = 2;
        assert!(matches!(
            validate_document(&document),
            Err(StoreError::ImportFormat(_))
        ));
    }

    #[test]
    fn rejects_dangling_relation() {
        let mut document = empty_document();
        document.relations.push(NoteTag::new("missing", "t1"));
        assert!(matches!(
            validate_document(&document),
            Err(StoreError::ImportFormat(_))
        ));
    }

    #[test]
    fn rejects_tag_names_equal_after_normalization() {
        let mut document = empty_document();
        for (id, name) in [("t1", "Work"), ("t2", " work ")] {
            document.tags.push(Tag {
                id: id.to_string(),
                name: name.to_string(),
                color: None,
                usage_count: 7,
                created_at: 1,
            });
        }
        assert!(matches!(
            validate_document(&document),
            Err(StoreError::ImportFormat(_))
        ));
    }

    #[test]
    fn default_name_is_reserved_only_when_default_is_absent() {
        let mut clash = empty_document();
        clash.categories = vec![Category {
            id: "c1".to_string(),
            ..Category::default_category(1)
        }];
        assert!(matches!(
            validate_document(&clash),
            Err(StoreError::ImportFormat(_))
        ));

        let mut with_default = empty_document();
        with_default.categories.push(Category {
            id: "c1".to_string(),
            name: "Inbox".to_string(),
            ..Category::default_category(1)
        });
        assert!(validate_document(&with_default).is_ok());
    }

    #[test]
    fn malformed_json_is_an_import_format_error() {
        assert!(matches!(
            parse_document("{ not json"),
            Err(StoreError::ImportFormat(_))
        ));
    }
}

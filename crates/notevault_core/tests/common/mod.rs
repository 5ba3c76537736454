#![allow(dead_code)]

use notevault_core::{
    BackendKind, Category, ExportDocument, Note, NoteStore, NoteTag, Priority, StoreConfig,
    SyncStatus, Tag, EXPORT_FORMAT_VERSION,
};

pub const BACKENDS: [BackendKind; 2] = [BackendKind::Object, BackendKind::Relational];

pub fn open_store(kind: BackendKind) -> NoteStore {
    open_with(StoreConfig::in_memory(kind))
}

pub fn open_with(config: StoreConfig) -> NoteStore {
    let mut store = NoteStore::open(config);
    store.initialize().unwrap();
    store
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn note_ids(notes: &[Note]) -> Vec<String> {
    notes.iter().map(|note| note.id.clone()).collect()
}

pub fn sorted_ids(notes: &[Note]) -> Vec<String> {
    let mut ids = note_ids(notes);
    ids.sort();
    ids
}

/// Note with fixed timestamps, for import fixtures.
pub fn fixture_note(id: &str, title: &str, content: &str, created_at: i64) -> Note {
    Note {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        category_id: None,
        tag_ids: Vec::new(),
        created_at,
        updated_at: created_at,
        is_favorite: false,
        is_archived: false,
        priority: Priority::Medium,
        remind_at: None,
        encrypted: false,
        sync_status: SyncStatus::Unsynced,
        last_synced_at: None,
    }
}

pub fn fixture_category(id: &str, name: &str, order: i64) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        color: None,
        icon: None,
        created_at: 1,
        order,
    }
}

pub fn fixture_tag(id: &str, name: &str) -> Tag {
    Tag {
        id: id.to_string(),
        name: name.to_string(),
        color: None,
        usage_count: 0,
        created_at: 1,
    }
}

pub fn document(
    notes: Vec<Note>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    relations: Vec<NoteTag>,
) -> ExportDocument {
    ExportDocument {
        format_version: EXPORT_FORMAT_VERSION,
        exported_at: 1,
        notes,
        categories,
        tags,
        relations,
    }
}

/// Every tag's counter must equal its relation count.
pub fn assert_usage_matches_relations(store: &mut NoteStore) {
    let snapshot = store.export_all().unwrap();
    for tag in &snapshot.tags {
        let refs = snapshot
            .relations
            .iter()
            .filter(|relation| relation.tag_id == tag.id)
            .count() as u64;
        assert_eq!(tag.usage_count, refs, "usage drift for tag {}", tag.name);
    }
}

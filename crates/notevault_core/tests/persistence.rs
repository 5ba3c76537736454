mod common;

use common::{ids, open_with, BACKENDS};
use notevault_core::{CategoryDraft, NoteDraft, NoteStore, StoreConfig, StoreError};

#[test]
fn file_backed_store_survives_reopen() {
    for kind in BACKENDS {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.store");
        let config = StoreConfig::at_path(kind, &path);

        let mut store = open_with(config.clone());
        let work = store.create_category(CategoryDraft::named("Work")).unwrap();
        let note = store
            .create_note(NoteDraft::new("persisted", "body").in_category(work.id.as_str()))
            .unwrap();
        let tagged = store.tag_note_by_names(&note.id, &ids(&["keep"])).unwrap();
        store.close().unwrap();
        assert!(path.exists());

        let reopened = open_with(config);
        assert_eq!(reopened.get_note(&note.id).unwrap().unwrap(), tagged);
        assert_eq!(reopened.find_tag_by_name("keep").unwrap().unwrap().usage_count, 1);
        let stats = reopened.get_stats().unwrap();
        assert_eq!(stats.note_count, 1);
        assert_eq!(stats.category_count, 2);
    }
}

#[test]
fn committed_writes_are_durable_without_close() {
    for kind in BACKENDS {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::at_path(kind, dir.path().join("notes.store"));

        let note_id = {
            let mut store = open_with(config.clone());
            store.create_note(NoteDraft::new("quick", "save")).unwrap().id
        };

        let reopened = open_with(config);
        assert!(reopened.get_note(&note_id).unwrap().is_some());
    }
}

#[test]
fn closed_store_rejects_operations_until_reinitialized() {
    for kind in BACKENDS {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open_with(StoreConfig::at_path(kind, dir.path().join("notes.store")));
        let note = store.create_note(NoteDraft::new("t", "c")).unwrap();
        store.close().unwrap();

        assert!(!store.is_initialized());
        assert!(matches!(
            store.get_note(&note.id),
            Err(StoreError::StorageNotInitialized)
        ));
        assert!(!store.get_stats().unwrap().initialized);

        store.initialize().unwrap();
        assert!(store.get_note(&note.id).unwrap().is_some());
    }
}

#[test]
fn corrupt_object_snapshot_fails_initialization() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    std::fs::write(&path, b"{ definitely not a snapshot").unwrap();

    let mut store = NoteStore::open(StoreConfig::at_path(notevault_core::BackendKind::Object, &path));
    assert!(matches!(store.initialize(), Err(StoreError::Backend(_))));
    assert!(!store.is_initialized());
}

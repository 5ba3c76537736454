mod common;

use common::{open_store, open_with, sorted_ids, BACKENDS};
use notevault_core::{
    BackendKind, NoteDraft, NotePatch, NoteStore, SearchQuery, StoreConfig, StoreError,
};

fn alpha_corpus(store: &mut NoteStore) -> Vec<String> {
    let mut expected = vec![
        store.create_note(NoteDraft::new("Alpha release", "notes")).unwrap().id,
        store.create_note(NoteDraft::new("misc", "the ALPHABET song")).unwrap().id,
        store
            .create_note(NoteDraft::new("archived", "old alpha plan").archived(true))
            .unwrap()
            .id,
    ];
    store.create_note(NoteDraft::new("beta", "nothing here")).unwrap();
    store.create_note(NoteDraft::new("alp ha", "split word")).unwrap();
    expected.sort();
    expected
}

/// Every backend/capability combination.
fn configs() -> Vec<StoreConfig> {
    BACKENDS
        .iter()
        .flat_map(|kind| {
            [
                StoreConfig::in_memory(*kind),
                StoreConfig::in_memory(*kind).native_search(false),
            ]
        })
        .collect()
}

#[test]
fn capability_flag_reflects_backend_and_configuration() {
    assert!(open_store(BackendKind::Relational).supports_native_search());
    assert!(!open_store(BackendKind::Object).supports_native_search());
    let disabled = open_with(StoreConfig::in_memory(BackendKind::Relational).native_search(false));
    assert!(!disabled.supports_native_search());
}

#[test]
fn every_path_finds_the_same_substring_matches() {
    for config in configs() {
        let mut store = open_with(config);
        let expected = alpha_corpus(&mut store);

        let hits = store.search_notes("alpha").unwrap();
        assert_eq!(sorted_ids(&hits), expected);

        let upper = store.search_notes("  ALPHA ").unwrap();
        assert_eq!(sorted_ids(&upper), expected);

        let greek = store.create_note(NoteDraft::new("ΟΔΟΣΑ", "")).unwrap();
        let hits = store.search_notes("ΟΔΟΣ").unwrap();
        assert_eq!(sorted_ids(&hits), vec![greek.id]);
    }
}

#[test]
fn short_queries_fall_back_to_substring_matching() {
    for config in configs() {
        let mut store = open_with(config);
        let hit = store.create_note(NoteDraft::new("Go", "tips")).unwrap();
        store.create_note(NoteDraft::new("Rust", "tips")).unwrap();

        let hits = store.search_notes("go").unwrap();
        assert_eq!(sorted_ids(&hits), vec![hit.id]);
    }
}

#[test]
fn blank_query_returns_nothing() {
    for config in configs() {
        let mut store = open_with(config);
        store.create_note(NoteDraft::new("anything", "at all")).unwrap();
        assert!(store.search_notes("   ").unwrap().is_empty());
        assert!(store.search_notes("").unwrap().is_empty());
    }
}

#[test]
fn blank_query_still_requires_initialized_storage() {
    for config in configs() {
        let mut store = NoteStore::open(config);
        let err = store.search_notes("   ").unwrap_err();
        assert!(matches!(err, StoreError::StorageNotInitialized));
    }
}

#[test]
fn archived_notes_can_be_excluded() {
    for config in configs() {
        let mut store = open_with(config);
        let expected = alpha_corpus(&mut store);

        let hits = store
            .search_notes_with(&SearchQuery::new("alpha").include_archived(false))
            .unwrap();
        assert_eq!(hits.len(), expected.len() - 1);
        assert!(hits.iter().all(|note| !note.is_archived));
    }
}

#[test]
fn limit_caps_the_result_count() {
    for config in configs() {
        let mut store = open_with(config);
        alpha_corpus(&mut store);

        let hits = store
            .search_notes_with(&SearchQuery::new("alpha").limit(2))
            .unwrap();
        assert_eq!(hits.len(), 2);

        let none = store
            .search_notes_with(&SearchQuery::new("alpha").limit(0))
            .unwrap();
        assert!(none.is_empty());
    }
}

#[test]
fn search_sees_edits_and_deletions() {
    for config in configs() {
        let mut store = open_with(config);
        let note = store.create_note(NoteDraft::new("draft", "alpha text")).unwrap();

        let patch = NotePatch {
            content: Some("gamma text".to_string()),
            ..NotePatch::default()
        };
        store.update_note(&note.id, patch).unwrap();
        assert!(store.search_notes("alpha").unwrap().is_empty());
        assert_eq!(store.search_notes("gamma").unwrap().len(), 1);

        store.delete_note(&note.id).unwrap();
        assert!(store.search_notes("gamma").unwrap().is_empty());
    }
}

#[test]
fn fallback_ranks_most_recent_first() {
    for kind in BACKENDS {
        let mut store = open_with(StoreConfig::in_memory(kind).native_search(false));
        let older = store.create_note(NoteDraft::new("report one", "")).unwrap();
        let newer = store.create_note(NoteDraft::new("report two", "")).unwrap();
        store
            .update_note(
                &newer.id,
                NotePatch {
                    content: Some("edited".to_string()),
                    ..NotePatch::default()
                },
            )
            .unwrap();

        let hits = store.search_notes("report").unwrap();
        assert_eq!(common::note_ids(&hits), vec![newer.id, older.id]);
    }
}

#[test]
fn search_results_carry_tags() {
    for config in configs() {
        let mut store = open_with(config);
        let note = store.create_note(NoteDraft::new("tagged", "searchable")).unwrap();
        store
            .tag_note_by_names(&note.id, &common::ids(&["found"]))
            .unwrap();

        let hits = store.search_notes("searchable").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tag_ids.len(), 1);
    }
}

mod common;

use common::{
    assert_usage_matches_relations, document, fixture_category, fixture_note, fixture_tag, ids,
    open_store, BACKENDS,
};
use notevault_core::{
    BackendKind, CategoryDraft, ExportDocument, NoteDraft, NoteStore, NoteTag, StoreError,
    EXPORT_FORMAT_VERSION,
};

fn populated(kind: BackendKind) -> NoteStore {
    let mut store = open_store(kind);
    let work = store.create_category(CategoryDraft::named("Work")).unwrap();
    let plan = store
        .create_note(NoteDraft::new("Plan", "roadmap").in_category(work.id.as_str()))
        .unwrap();
    let idea = store.create_note(NoteDraft::new("Idea", "sketch").favorite(true)).unwrap();
    store.tag_note_by_names(&plan.id, &ids(&["urgent", "2024"])).unwrap();
    store.tag_note_by_names(&idea.id, &ids(&["2024"])).unwrap();
    store
}

/// Export without the volatile export timestamp.
fn contents(store: &mut NoteStore) -> ExportDocument {
    let mut snapshot = store.export_all().unwrap();
    snapshot.exported_at = 0;
    snapshot
}

#[test]
fn export_then_import_leaves_the_store_unchanged() {
    for kind in BACKENDS {
        let mut store = populated(kind);
        let before = contents(&mut store);
        let stats_before = store.get_stats().unwrap();

        let summary = store.import_all(&before).unwrap();

        assert_eq!(summary.notes, 2);
        assert_eq!(summary.relations, 3);
        assert_eq!(contents(&mut store), before);
        assert_eq!(store.get_stats().unwrap(), stats_before);
    }
}

#[test]
fn export_carries_format_version_and_hydrated_notes() {
    for kind in BACKENDS {
        let mut store = populated(kind);
        let snapshot = store.export_all().unwrap();

        assert_eq!(snapshot.format_version, EXPORT_FORMAT_VERSION);
        assert_eq!(snapshot.categories.len(), 2);
        assert_eq!(snapshot.tags.len(), 2);
        let plan = snapshot.notes.iter().find(|note| note.title == "Plan").unwrap();
        assert_eq!(plan.tag_ids.len(), 2);
    }
}

#[test]
fn json_round_trip_moves_data_between_backends() {
    let mut source = populated(BackendKind::Object);
    let json = source.export_json().unwrap();
    assert!(json.contains("\"formatVersion\": 1"));

    let mut target = open_store(BackendKind::Relational);
    target.create_note(NoteDraft::new("overwritten", "")).unwrap();
    target.import_json(&json).unwrap();

    assert_eq!(contents(&mut target), contents(&mut source));
    assert_eq!(target.search_notes("roadmap").unwrap().len(), 1);
}

#[test]
fn rejected_import_leaves_prior_state_intact() {
    for kind in BACKENDS {
        let mut store = populated(kind);
        let before = contents(&mut store);

        let mut bad_version = before.clone();
        bad_version.format_version = 99;
        let mut dangling = before.clone();
        dangling.relations.push(NoteTag::new("ghost-note", "ghost-tag"));
        let mut duplicate_note = before.clone();
        duplicate_note.notes.push(before.notes[0].clone());
        let mut unknown_category = before.clone();
        unknown_category.notes[0].category_id = Some("nowhere".to_string());

        for broken in [bad_version, dangling, duplicate_note, unknown_category] {
            assert!(matches!(
                store.import_all(&broken),
                Err(StoreError::ImportFormat(_))
            ));
        }
        assert!(matches!(
            store.import_json("{\"formatVersion\": 1"),
            Err(StoreError::ImportFormat(_))
        ));
        assert_eq!(contents(&mut store), before);
    }
}

#[test]
fn import_recomputes_usage_and_merges_note_tag_ids() {
    for kind in BACKENDS {
        let mut tagged = fixture_note("n1", "tagged", "", 10);
        tagged.tag_ids = vec!["a".to_string()];
        let mut wrong_count = fixture_tag("b", "bravo");
        wrong_count.usage_count = 40;

        let incoming = document(
            vec![tagged, fixture_note("n2", "plain", "", 20)],
            vec![fixture_category("work", "Work", 1)],
            vec![fixture_tag("a", "alpha"), wrong_count],
            vec![NoteTag::new("n2", "b"), NoteTag::new("n1", "a")],
        );

        let mut store = open_store(kind);
        let summary = store.import_all(&incoming).unwrap();

        assert_eq!(summary.relations, 2);
        assert_eq!(store.get_tag("a").unwrap().unwrap().usage_count, 1);
        assert_eq!(store.get_tag("b").unwrap().unwrap().usage_count, 1);
        assert_eq!(store.get_note("n1").unwrap().unwrap().tag_ids, vec!["a".to_string()]);
        assert!(store.get_category("default").unwrap().is_some());
        assert_usage_matches_relations(&mut store);
    }
}

#[test]
fn import_without_relations_field_is_accepted() {
    for kind in BACKENDS {
        let json = r#"{
            "formatVersion": 1,
            "exportedAt": 5,
            "notes": [
                {"id": "n1", "title": "t", "content": "c", "tagIds": ["x"],
                 "createdAt": 1, "updatedAt": 2}
            ],
            "categories": [],
            "tags": [{"id": "x", "name": "X", "createdAt": 1}]
        }"#;

        let mut store = open_store(kind);
        store.import_json(json).unwrap();

        let note = store.get_note("n1").unwrap().unwrap();
        assert_eq!(note.tag_ids, vec!["x".to_string()]);
        assert_eq!(note.updated_at, 2);
        assert_eq!(store.get_tag("x").unwrap().unwrap().name, "x");
    }
}

#[test]
fn import_rejects_a_category_that_collides_with_the_reseeded_default() {
    for kind in BACKENDS {
        let mut store = populated(kind);
        let before = contents(&mut store);

        for name in ["General", "GENERAL"] {
            let clash = document(
                vec![fixture_note("n1", "t", "c", 1)],
                vec![fixture_category("c1", name, 0)],
                Vec::new(),
                Vec::new(),
            );
            assert!(matches!(
                store.import_all(&clash),
                Err(StoreError::ImportFormat(_))
            ));
        }
        assert_eq!(contents(&mut store), before);

        let renamed = document(
            Vec::new(),
            vec![fixture_category("c1", "Inbox", 0)],
            Vec::new(),
            Vec::new(),
        );
        store.import_all(&renamed).unwrap();
        let names: Vec<String> = store
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"General".to_string()));
    }
}

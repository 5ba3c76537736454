mod common;

use common::{document, fixture_category, fixture_note, fixture_tag, note_ids, open_store, BACKENDS};
use notevault_core::{
    BackendKind, Field, NoteFilter, NoteListQuery, NoteStore, NoteTag, OrderBy, Priority,
    DEFAULT_CATEGORY_ID,
};

/// n1..n5 with created/updated at 100..500.
fn seeded_store(kind: BackendKind) -> NoteStore {
    let mut n1 = fixture_note("n1", "Alpha plan", "first", 100);
    n1.category_id = Some("work".to_string());
    n1.is_favorite = true;
    n1.priority = Priority::High;
    let mut n2 = fixture_note("n2", "beta", "second", 200);
    n2.category_id = Some("work".to_string());
    let mut n3 = fixture_note("n3", "gamma", "third", 300);
    n3.category_id = Some("home".to_string());
    n3.is_favorite = true;
    let mut n4 = fixture_note("n4", "delta", "fourth", 400);
    n4.is_favorite = true;
    n4.is_archived = true;
    let mut n5 = fixture_note("n5", "epsilon", "fifth", 500);
    n5.category_id = Some(DEFAULT_CATEGORY_ID.to_string());
    n5.priority = Priority::Urgent;

    let fixture = document(
        vec![n1, n2, n3, n4, n5],
        vec![fixture_category("work", "Work", 1), fixture_category("home", "Home", 2)],
        vec![fixture_tag("red", "red"), fixture_tag("blue", "blue")],
        vec![
            NoteTag::new("n1", "red"),
            NoteTag::new("n1", "blue"),
            NoteTag::new("n2", "red"),
            NoteTag::new("n3", "blue"),
        ],
    );

    let mut store = open_store(kind);
    store.import_all(&fixture).unwrap();
    store
}

fn list(store: &NoteStore, query: NoteListQuery) -> Vec<String> {
    note_ids(&store.list_notes(&query).unwrap())
}

fn filtered(store: &NoteStore, filter: NoteFilter) -> Vec<String> {
    list(store, NoteListQuery::filtered(filter))
}

#[test]
fn favorite_and_category_filters_intersect() {
    for kind in BACKENDS {
        let store = seeded_store(kind);
        assert_eq!(
            filtered(&store, NoteFilter::default().favorite(true).in_category("work")),
            vec!["n1"]
        );
        assert_eq!(
            filtered(&store, NoteFilter::default().favorite(false).in_category("work")),
            vec!["n2"]
        );
    }
}

#[test]
fn default_category_filter_includes_uncategorized_notes() {
    for kind in BACKENDS {
        let store = seeded_store(kind);
        assert_eq!(
            filtered(&store, NoteFilter::default().in_category(DEFAULT_CATEGORY_ID)),
            vec!["n5", "n4"]
        );
        assert_eq!(filtered(&store, NoteFilter::default().in_category("home")), vec!["n3"]);
        assert!(filtered(&store, NoteFilter::default().in_category("nowhere")).is_empty());
    }
}

#[test]
fn tag_filter_requires_every_listed_tag() {
    for kind in BACKENDS {
        let store = seeded_store(kind);
        assert_eq!(filtered(&store, NoteFilter::default().with_tag("red")), vec!["n2", "n1"]);
        assert_eq!(
            filtered(&store, NoteFilter::default().with_tag("red").with_tag("blue")),
            vec!["n1"]
        );
        assert!(filtered(&store, NoteFilter::default().with_tag("red").with_tag("ghost")).is_empty());
        assert_eq!(
            filtered(&store, NoteFilter::default().with_tag("blue").favorite(true)),
            vec!["n3", "n1"]
        );
    }
}

#[test]
fn archive_and_priority_filters() {
    for kind in BACKENDS {
        let store = seeded_store(kind);
        assert_eq!(
            filtered(&store, NoteFilter::default().archived(false)),
            vec!["n5", "n3", "n2", "n1"]
        );
        assert_eq!(filtered(&store, NoteFilter::default().archived(true)), vec!["n4"]);
        assert_eq!(
            filtered(&store, NoteFilter::default().with_priority(Priority::Urgent)),
            vec!["n5"]
        );
        assert_eq!(
            filtered(&store, NoteFilter::default().with_priority(Priority::Medium)),
            vec!["n4", "n3", "n2"]
        );
    }
}

#[test]
fn creation_range_bounds_are_exclusive() {
    for kind in BACKENDS {
        let store = seeded_store(kind);
        assert_eq!(
            filtered(&store, NoteFilter::default().created_after(200).created_before(500)),
            vec!["n4", "n3"]
        );
    }
}

#[test]
fn default_listing_is_most_recent_first_with_paging() {
    for kind in BACKENDS {
        let store = seeded_store(kind);
        assert_eq!(
            list(&store, NoteListQuery::default()),
            vec!["n5", "n4", "n3", "n2", "n1"]
        );
        assert_eq!(list(&store, NoteListQuery::default().page(2, 1)), vec!["n4", "n3"]);
        assert_eq!(list(&store, NoteListQuery::default().page(2, 4)), vec!["n1"]);
        assert!(list(&store, NoteListQuery::default().page(2, 9)).is_empty());
        assert!(list(&store, NoteListQuery::default().page(0, 0)).is_empty());
    }
}

#[test]
fn explicit_ordering_is_honored() {
    for kind in BACKENDS {
        let store = seeded_store(kind);
        assert_eq!(
            list(&store, NoteListQuery::default().order_by(OrderBy::asc(Field::Title))),
            vec!["n1", "n2", "n4", "n5", "n3"]
        );
        assert_eq!(
            list(&store, NoteListQuery::default().order_by(OrderBy::asc(Field::CreatedAt))),
            vec!["n1", "n2", "n3", "n4", "n5"]
        );
        assert_eq!(
            list(
                &store,
                NoteListQuery::filtered(NoteFilter::default().archived(false))
                    .order_by(OrderBy::desc(Field::Priority))
                    .page(2, 0)
            ),
            vec!["n5", "n1"]
        );
    }
}

#[test]
fn listed_notes_carry_their_tags() {
    for kind in BACKENDS {
        let store = seeded_store(kind);
        let notes = store
            .list_notes(&NoteListQuery::filtered(NoteFilter::default().with_tag("blue")))
            .unwrap();
        let n1 = notes.iter().find(|note| note.id == "n1").unwrap();
        assert_eq!(n1.tag_ids, vec!["blue".to_string(), "red".to_string()]);
    }
}

#[test]
fn both_backends_agree_on_every_filter() {
    let object = seeded_store(BackendKind::Object);
    let relational = seeded_store(BackendKind::Relational);
    let filters = [
        NoteFilter::default(),
        NoteFilter::default().favorite(true),
        NoteFilter::default().in_category(DEFAULT_CATEGORY_ID).archived(false),
        NoteFilter::default().with_tag("blue"),
        NoteFilter::default().created_before(300),
    ];
    for filter in filters {
        assert_eq!(
            filtered(&object, filter.clone()),
            filtered(&relational, filter),
        );
    }
}

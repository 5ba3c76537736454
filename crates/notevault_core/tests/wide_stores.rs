mod common;

use common::{document, fixture_note, fixture_tag, open_store};
use notevault_core::{BackendKind, NoteFilter, NoteListQuery, NoteTag};

// More notes than SQLite accepts bound variables in one statement.
const NOTE_COUNT: usize = 33_000;

#[test]
fn relational_reads_scale_past_the_bound_variable_limit() {
    let notes = (0..NOTE_COUNT)
        .map(|index| fixture_note(&format!("n{index:05}"), &format!("alpha {index}"), "", 1))
        .collect();
    let relations = (0..NOTE_COUNT)
        .map(|index| NoteTag::new(format!("n{index:05}"), "bulk"))
        .collect();
    let mut store = open_store(BackendKind::Relational);
    store
        .import_all(&document(notes, Vec::new(), vec![fixture_tag("bulk", "bulk")], relations))
        .unwrap();

    let listed = store.list_notes(&NoteListQuery::default()).unwrap();
    assert_eq!(listed.len(), NOTE_COUNT);
    assert!(listed.iter().all(|note| note.tag_ids == vec!["bulk".to_string()]));

    let tagged = NoteListQuery::filtered(NoteFilter::default().with_tag("bulk")).page(10, 5);
    let page = store.list_notes(&tagged).unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page[0].id, "n00005");

    let exported = store.export_all().unwrap();
    assert_eq!(exported.notes.len(), NOTE_COUNT);
    assert_eq!(exported.relations.len(), NOTE_COUNT);
    assert_eq!(exported.tags[0].usage_count, NOTE_COUNT as u64);

    // Full-text hits, then a short query that scans every note.
    assert_eq!(store.search_notes("alpha").unwrap().len(), NOTE_COUNT);
    assert_eq!(store.search_notes("al").unwrap().len(), NOTE_COUNT);
}

use notevault_core::db::migrations::latest_version;
use notevault_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "categories");
    assert_table_exists(&conn, "tags");
    assert_table_exists(&conn, "notes");
    assert_table_exists(&conn, "note_tags");
    assert_index_exists(&conn, "idx_notes_category");
    assert_index_exists(&conn, "idx_notes_updated");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notevault.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "notes");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn relation_rows_follow_note_deletion() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO tags (id, name, created_at) VALUES ('t1', 'urgent', 1);
         INSERT INTO notes (id, title, content, created_at, updated_at)
         VALUES ('n1', 'a', 'b', 1, 1);
         INSERT INTO note_tags (note_id, tag_id) VALUES ('n1', 't1');
         DELETE FROM notes WHERE id = 'n1';",
    )
    .unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM note_tags;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn category_names_are_unique_ignoring_case() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("INSERT INTO categories (id, name, created_at) VALUES ('c1', 'Work', 1);")
        .unwrap();

    let duplicate =
        conn.execute_batch("INSERT INTO categories (id, name, created_at) VALUES ('c2', 'WORK', 1);");
    assert!(duplicate.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert_schema_object(conn, "table", table_name);
}

fn assert_index_exists(conn: &Connection, index_name: &str) {
    assert_schema_object(conn, "index", index_name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}

//! Optional FTS5 index over note title/content.
//!
//! # Responsibility
//! - Probe once whether the linked SQLite supports FTS5 with the `trigram`
//!   tokenizer.
//! - Provision the external-content `notes_fts` table and its sync triggers.
//!
//! # Invariants
//! - The trigram tokenizer makes phrase matches equal to case-insensitive
//!   substring matches, so native and fallback search agree on match sets.
//! - A newly created index is rebuilt from existing `notes` rows.

use super::DbResult;
use log::{info, warn};
use rusqlite::Connection;

/// Shortest query the trigram tokenizer can match.
pub const TRIGRAM_MIN_CHARS: usize = 3;

const FTS_SCHEMA_SQL: &str = "
CREATE VIRTUAL TABLE notes_fts USING fts5(
    title,
    content,
    content = 'notes',
    content_rowid = 'rowid',
    tokenize = 'trigram'
);

CREATE TRIGGER IF NOT EXISTS notes_fts_after_insert AFTER INSERT ON notes BEGIN
    INSERT INTO notes_fts (rowid, title, content)
    VALUES (new.rowid, new.title, new.content);
END;

CREATE TRIGGER IF NOT EXISTS notes_fts_after_delete AFTER DELETE ON notes BEGIN
    INSERT INTO notes_fts (notes_fts, rowid, title, content)
    VALUES ('delete', old.rowid, old.title, old.content);
END;

CREATE TRIGGER IF NOT EXISTS notes_fts_after_update AFTER UPDATE OF title, content ON notes BEGIN
    INSERT INTO notes_fts (notes_fts, rowid, title, content)
    VALUES ('delete', old.rowid, old.title, old.content);
    INSERT INTO notes_fts (rowid, title, content)
    VALUES (new.rowid, new.title, new.content);
END;

INSERT INTO notes_fts (notes_fts) VALUES ('rebuild');
";

/// Returns whether FTS5 with the trigram tokenizer is usable.
///
/// Never fails: any probe error means "unsupported".
pub fn probe_trigram_fts(conn: &Connection) -> bool {
    let probe = conn.execute_batch(
        "CREATE VIRTUAL TABLE temp.notevault_fts_probe USING fts5(body, tokenize = 'trigram');
         DROP TABLE temp.notevault_fts_probe;",
    );
    match probe {
        Ok(()) => true,
        Err(err) => {
            warn!("event=fts_probe module=db status=unsupported error={err}");
            false
        }
    }
}

/// Returns whether `notes_fts` already exists.
pub fn notes_fts_exists(conn: &Connection) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'notes_fts'
        );",
        [],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Creates `notes_fts` plus triggers when absent. Idempotent.
pub fn ensure_notes_fts(conn: &mut Connection) -> DbResult<()> {
    if notes_fts_exists(conn)? {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(FTS_SCHEMA_SQL)?;
    tx.commit()?;
    info!("event=fts_provision module=db status=ok table=notes_fts tokenizer=trigram");
    Ok(())
}

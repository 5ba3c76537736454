//! SQLite FTS5 query execution for the relational backend.
//!
//! # Responsibility
//! - Turn user text into a safe FTS5 phrase expression.
//! - Return ranked note ids from `notes_fts`.
//!
//! # Invariants
//! - User text is always quoted as one phrase; FTS5 operators are inert.
//! - Ordering is deterministic: `bm25`, then `updated_at DESC`, then `id ASC`.

use crate::db::fts::TRIGRAM_MIN_CHARS;
use crate::db::DbError;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type FtsResult<T> = Result<T, FtsError>;

/// Native search failures. All of them route the caller to the fallback path.
#[derive(Debug)]
pub enum FtsError {
    /// Query is blank or shorter than the trigram width.
    QueryTooShort { query: String },
    /// FTS5 rejected the match expression.
    InvalidQuery { query: String, message: String },
    Db(DbError),
}

impl Display for FtsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueryTooShort { query } => write!(
                f,
                "query `{query}` is shorter than {TRIGRAM_MIN_CHARS} characters"
            ),
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FtsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for FtsError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Builds a single-phrase FTS5 expression from user text.
///
/// Returns `None` when the trimmed text cannot be matched by the trigram
/// tokenizer.
pub fn build_phrase_expression(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.chars().count() < TRIGRAM_MIN_CHARS {
        return None;
    }
    let escaped = trimmed.replace('"', "\"\"");
    Some(format!("\"{escaped}\""))
}

/// Runs a phrase search and returns ranked note ids.
pub fn search_note_ids(conn: &Connection, text: &str, limit: Option<u32>) -> FtsResult<Vec<String>> {
    let Some(match_expr) = build_phrase_expression(text) else {
        return Err(FtsError::QueryTooShort {
            query: text.trim().to_string(),
        });
    };

    let mut sql = String::from(
        "SELECT notes.id
         FROM notes_fts
         JOIN notes ON notes.rowid = notes_fts.rowid
         WHERE notes_fts MATCH ?
         ORDER BY bm25(notes_fts), notes.updated_at DESC, notes.id ASC",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut ids = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

fn map_query_error(err: rusqlite::Error, query: &str) -> FtsError {
    if is_match_syntax_error(&err) {
        return FtsError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }
    FtsError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::build_phrase_expression;

    #[test]
    fn phrase_expression_quotes_and_escapes() {
        assert_eq!(
            build_phrase_expression("  say \"hi\" now "),
            Some("\"say \"\"hi\"\" now\"".to_string())
        );
    }

    #[test]
    fn short_or_blank_text_has_no_expression() {
        assert_eq!(build_phrase_expression("   "), None);
        assert_eq!(build_phrase_expression("ab"), None);
        assert!(build_phrase_expression("abc").is_some());
    }
}

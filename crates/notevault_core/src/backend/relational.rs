//! Relational backend: SQLite tables, native indexes and optional FTS.
//!
//! # Responsibility
//! - Map records onto the `categories`, `tags`, `notes` and `note_tags`
//!   tables created by migrations.
//! - Push structured predicates, ordering and paging down to SQL.
//! - Serve native full-text search when the trigram FTS index is available.
//!
//! # Invariants
//! - Writes use `INSERT ... ON CONFLICT DO UPDATE`; `REPLACE` would delete the
//!   old row and fire relation cascades.
//! - Units of work run inside `BEGIN IMMEDIATE` transactions.
//! - SQL ordering matches the in-memory ordering of the object store:
//!   binary collation, `NULL` first, ties by primary key ascending.

use super::query::{Direction, Field, FieldValue, Predicate, ScanQuery};
use super::{
    BackendCapabilities, BackendError, BackendKind, BackendResult, StorageBackend, StorageOps,
    StorageRead, UnitOfWork,
};
use crate::config::StorageLocation;
use crate::db::fts::{ensure_notes_fts, probe_trigram_fts};
use crate::db::{open_db, open_db_in_memory};
use crate::error::{StoreError, StoreResult};
use crate::model::{
    split_relation_key, Category, EntityKind, Note, NoteTag, Priority, Record, SyncStatus, Tag,
    DEFAULT_CATEGORY_ID,
};
use crate::search::fts::search_note_ids;
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::time::Instant;

const NEVER: &str = "0";

/// Longest `IN` list bound as one placeholder per value. Longer lists travel
/// as a single JSON array so SQLite's bound-variable limit never applies.
const INLINE_IN_VALUES: usize = 256;

const NOTE_COLUMNS: &str = "id, title, content, category_id, created_at, updated_at, \
    is_favorite, is_archived, priority, remind_at, encrypted, sync_status, last_synced_at";
const CATEGORY_COLUMNS: &str = "id, name, description, color, icon, created_at, display_order";
const TAG_COLUMNS: &str = "id, name, color, usage_count, created_at";
const RELATION_COLUMNS: &str = "note_id, tag_id";

/// SQLite-backed storage strategy.
#[derive(Debug)]
pub struct RelationalStore {
    location: StorageLocation,
    conn: Option<Connection>,
    fts_enabled: bool,
}

impl RelationalStore {
    pub fn new(location: StorageLocation) -> Self {
        Self {
            location,
            conn: None,
            fts_enabled: false,
        }
    }

    fn conn(&self) -> BackendResult<&Connection> {
        self.conn.as_ref().ok_or(BackendError::NotInitialized)
    }

    fn open_connection(&self) -> BackendResult<Connection> {
        let conn = match &self.location {
            StorageLocation::InMemory => open_db_in_memory()?,
            StorageLocation::Path(path) => open_db(path)?,
        };
        Ok(conn)
    }
}

impl StorageRead for RelationalStore {
    fn get(&self, kind: EntityKind, key: &str) -> BackendResult<Option<Record>> {
        get_record(self.conn()?, kind, key)
    }

    fn scan(&self, query: &ScanQuery) -> BackendResult<Vec<Record>> {
        scan_records(self.conn()?, query)
    }

    fn count(&self, kind: EntityKind) -> BackendResult<u64> {
        count_records(self.conn()?, kind)
    }
}

impl StorageBackend for RelationalStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    fn initialize(&mut self) -> BackendResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let started_at = Instant::now();
        let mut conn = self.open_connection()?;
        let fts_enabled = if probe_trigram_fts(&conn) {
            match ensure_notes_fts(&mut conn) {
                Ok(()) => true,
                Err(err) => {
                    warn!("event=backend_init module=relational status=degraded fts=off error={err}");
                    false
                }
            }
        } else {
            false
        };

        self.conn = Some(conn);
        self.fts_enabled = fts_enabled;
        info!(
            "event=backend_init module=relational status=ok mode={} fts={} duration_ms={}",
            self.location.mode(),
            fts_enabled,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.conn.is_some()
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            native_search: self.conn.is_some() && self.fts_enabled,
            native_indexes: true,
        }
    }

    fn transaction(&mut self, work: &mut UnitOfWork<'_>) -> StoreResult<()> {
        let conn = self
            .conn
            .as_mut()
            .ok_or(StoreError::StorageNotInitialized)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let result = {
            let mut ops = SqliteOps { conn: &tx };
            work(&mut ops)
        };

        match result {
            Ok(()) => {
                tx.commit()?;
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=tx_rollback module=relational status=error error={rollback_err}"
                    );
                }
                Err(err)
            }
        }
    }

    fn search_native(&self, text: &str, limit: Option<u32>) -> BackendResult<Vec<String>> {
        let conn = self.conn()?;
        if !self.fts_enabled {
            return Err(BackendError::SearchUnavailable(
                "full-text index is not provisioned".to_string(),
            ));
        }
        search_note_ids(conn, text, limit)
            .map_err(|err| BackendError::SearchUnavailable(err.to_string()))
    }

    fn close(&mut self) -> BackendResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| BackendError::from(err))?;
        }
        self.fts_enabled = false;
        info!("event=backend_close module=relational status=ok");
        Ok(())
    }
}

/// Write handle for one relational unit of work.
struct SqliteOps<'c> {
    conn: &'c Connection,
}

impl StorageRead for SqliteOps<'_> {
    fn get(&self, kind: EntityKind, key: &str) -> BackendResult<Option<Record>> {
        get_record(self.conn, kind, key)
    }

    fn scan(&self, query: &ScanQuery) -> BackendResult<Vec<Record>> {
        scan_records(self.conn, query)
    }

    fn count(&self, kind: EntityKind) -> BackendResult<u64> {
        count_records(self.conn, kind)
    }
}

impl StorageOps for SqliteOps<'_> {
    fn put(&mut self, record: &Record) -> BackendResult<String> {
        record.validate()?;
        match record {
            Record::Note(note) => upsert_note(self.conn, note)?,
            Record::Category(category) => upsert_category(self.conn, category)?,
            Record::Tag(tag) => upsert_tag(self.conn, tag)?,
            Record::NoteTag(relation) => {
                self.conn.execute(
                    "INSERT INTO note_tags (note_id, tag_id)
                     VALUES (?1, ?2)
                     ON CONFLICT (note_id, tag_id) DO NOTHING;",
                    params![relation.note_id, relation.tag_id],
                )?;
            }
        }
        Ok(record.key())
    }

    fn delete(&mut self, kind: EntityKind, key: &str) -> BackendResult<()> {
        match kind {
            EntityKind::NoteTag => {
                if let Some((note_id, tag_id)) = split_relation_key(key) {
                    self.conn.execute(
                        "DELETE FROM note_tags WHERE note_id = ?1 AND tag_id = ?2;",
                        params![note_id, tag_id],
                    )?;
                }
            }
            _ => {
                self.conn.execute(
                    &format!("DELETE FROM {} WHERE id = ?1;", table_name(kind)),
                    [key],
                )?;
            }
        }
        Ok(())
    }

    fn clear_all(&mut self) -> BackendResult<()> {
        self.conn.execute_batch(
            "DELETE FROM note_tags;
             DELETE FROM notes;
             DELETE FROM tags;
             DELETE FROM categories;",
        )?;
        Ok(())
    }
}

fn upsert_note(conn: &Connection, note: &Note) -> BackendResult<()> {
    conn.execute(
        "INSERT INTO notes (
            id, title, content, category_id, created_at, updated_at,
            is_favorite, is_archived, priority, remind_at, encrypted,
            sync_status, last_synced_at
         )
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT (id) DO UPDATE SET
            title = excluded.title,
            content = excluded.content,
            category_id = excluded.category_id,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            is_favorite = excluded.is_favorite,
            is_archived = excluded.is_archived,
            priority = excluded.priority,
            remind_at = excluded.remind_at,
            encrypted = excluded.encrypted,
            sync_status = excluded.sync_status,
            last_synced_at = excluded.last_synced_at;",
        params![
            note.id,
            note.title,
            note.content,
            note.category_id,
            note.created_at,
            note.updated_at,
            note.is_favorite,
            note.is_archived,
            note.priority.ordinal(),
            note.remind_at,
            note.encrypted,
            note.sync_status.as_str(),
            note.last_synced_at,
        ],
    )?;
    Ok(())
}

fn upsert_category(conn: &Connection, category: &Category) -> BackendResult<()> {
    conn.execute(
        "INSERT INTO categories (id, name, description, color, icon, created_at, display_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            description = excluded.description,
            color = excluded.color,
            icon = excluded.icon,
            created_at = excluded.created_at,
            display_order = excluded.display_order;",
        params![
            category.id,
            category.name,
            category.description,
            category.color,
            category.icon,
            category.created_at,
            category.order,
        ],
    )?;
    Ok(())
}

fn upsert_tag(conn: &Connection, tag: &Tag) -> BackendResult<()> {
    let usage_count = i64::try_from(tag.usage_count).map_err(|_| {
        BackendError::InvalidData(format!("tag {} usage count overflows", tag.id))
    })?;
    conn.execute(
        "INSERT INTO tags (id, name, color, usage_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            color = excluded.color,
            usage_count = excluded.usage_count,
            created_at = excluded.created_at;",
        params![tag.id, tag.name, tag.color, usage_count, tag.created_at],
    )?;
    Ok(())
}

fn get_record(conn: &Connection, kind: EntityKind, key: &str) -> BackendResult<Option<Record>> {
    let query = match kind {
        EntityKind::NoteTag => {
            let Some((note_id, tag_id)) = split_relation_key(key) else {
                return Ok(None);
            };
            ScanQuery::all(kind)
                .filter(Predicate::Eq(Field::NoteId, FieldValue::text(note_id)))
                .filter(Predicate::Eq(Field::TagId, FieldValue::text(tag_id)))
        }
        _ => ScanQuery::all(kind).filter(Predicate::Eq(Field::Id, FieldValue::text(key))),
    };
    Ok(scan_records(conn, &query.limit(1))?.into_iter().next())
}

fn count_records(conn: &Connection, kind: EntityKind) -> BackendResult<u64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {};", table_name(kind)),
        [],
        |row| row.get(0),
    )?;
    Ok(u64::try_from(count).unwrap_or_default())
}

fn scan_records(conn: &Connection, query: &ScanQuery) -> BackendResult<Vec<Record>> {
    let (sql, bind_values) = build_scan_sql(query);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(record_from_row(query.kind, row)?);
    }
    Ok(records)
}

fn build_scan_sql(query: &ScanQuery) -> (String, Vec<Value>) {
    let kind = query.kind;
    let mut sql = format!("SELECT {} FROM {}", select_columns(kind), table_name(kind));
    let mut bind_values: Vec<Value> = Vec::new();

    let clauses: Vec<String> = query
        .predicates
        .iter()
        .map(|predicate| predicate_clause(kind, predicate, &mut bind_values))
        .collect();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    sql.push_str(" ORDER BY ");
    if let Some(order) = query.order {
        if let Some(expr) = order_expression(kind, order.field) {
            sql.push_str(expr);
            sql.push_str(match order.direction {
                Direction::Asc => " ASC, ",
                Direction::Desc => " DESC, ",
            });
        }
    }
    sql.push_str(primary_key_order(kind));

    if query.limit.is_some() || query.offset > 0 {
        sql.push_str(" LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(query.limit.map_or(-1, i64::from)));
        bind_values.push(Value::Integer(i64::from(query.offset)));
    }

    (sql, bind_values)
}

fn predicate_clause(kind: EntityKind, predicate: &Predicate, bind_values: &mut Vec<Value>) -> String {
    match predicate {
        Predicate::Eq(field, value) => {
            predicate_in_clause(kind, *field, std::slice::from_ref(value), bind_values)
        }
        Predicate::In(field, values) => predicate_in_clause(kind, *field, values, bind_values),
        Predicate::After(field, bound) => range_clause(kind, *field, ">", *bound, bind_values),
        Predicate::Before(field, bound) => range_clause(kind, *field, "<", *bound, bind_values),
    }
}

fn predicate_in_clause(
    kind: EntityKind,
    field: Field,
    values: &[FieldValue],
    bind_values: &mut Vec<Value>,
) -> String {
    let Some(column) = column_name(kind, field) else {
        return NEVER.to_string();
    };

    let accepted: Vec<Value> = values
        .iter()
        .filter_map(|value| sql_value(field, value))
        .collect();
    if accepted.is_empty() {
        return NEVER.to_string();
    }

    let includes_default = kind == EntityKind::Note
        && field == Field::CategoryId
        && values
            .iter()
            .any(|value| matches!(value, FieldValue::Text(id) if id == DEFAULT_CATEGORY_ID));

    let clause = match accepted.len() {
        1 => {
            bind_values.extend(accepted);
            format!("{column} = ?")
        }
        len if len <= INLINE_IN_VALUES => {
            let placeholders = vec!["?"; len].join(", ");
            bind_values.extend(accepted);
            format!("{column} IN ({placeholders})")
        }
        _ => {
            bind_values.push(Value::Text(json_array(&accepted)));
            format!("{column} IN (SELECT value FROM json_each(?))")
        }
    };

    if includes_default {
        format!("({clause} OR {column} IS NULL)")
    } else {
        clause
    }
}

/// Packs bind values into one JSON array for `json_each`.
fn json_array(values: &[Value]) -> String {
    let items: Vec<serde_json::Value> = values
        .iter()
        .map(|value| match value {
            Value::Integer(number) => serde_json::Value::from(*number),
            Value::Text(text) => serde_json::Value::from(text.as_str()),
            _ => serde_json::Value::Null,
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

fn range_clause(
    kind: EntityKind,
    field: Field,
    operator: &str,
    bound: i64,
    bind_values: &mut Vec<Value>,
) -> String {
    match (column_name(kind, field), field_type(field)) {
        (Some(column), FieldType::Int) => {
            bind_values.push(Value::Integer(bound));
            format!("{column} {operator} ?")
        }
        _ => NEVER.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    Bool,
    Int,
    Text,
}

fn field_type(field: Field) -> FieldType {
    match field {
        Field::IsFavorite | Field::IsArchived => FieldType::Bool,
        Field::Priority | Field::CreatedAt | Field::UpdatedAt | Field::Order => FieldType::Int,
        Field::Id
        | Field::Title
        | Field::CategoryId
        | Field::Name
        | Field::NoteId
        | Field::TagId => FieldType::Text,
    }
}

// Values of the wrong type never match, same as in-memory evaluation.
fn sql_value(field: Field, value: &FieldValue) -> Option<Value> {
    match (field_type(field), value) {
        (FieldType::Bool, FieldValue::Bool(flag)) => Some(Value::Integer(i64::from(*flag))),
        (FieldType::Int, FieldValue::Int(number)) => Some(Value::Integer(*number)),
        (FieldType::Text, FieldValue::Text(text)) => Some(Value::Text(text.clone())),
        _ => None,
    }
}

fn column_name(kind: EntityKind, field: Field) -> Option<&'static str> {
    match (kind, field) {
        (EntityKind::Note, Field::Id) => Some("id"),
        (EntityKind::Note, Field::Title) => Some("title"),
        (EntityKind::Note, Field::CategoryId) => Some("category_id"),
        (EntityKind::Note, Field::IsFavorite) => Some("is_favorite"),
        (EntityKind::Note, Field::IsArchived) => Some("is_archived"),
        (EntityKind::Note, Field::Priority) => Some("priority"),
        (EntityKind::Note, Field::CreatedAt) => Some("created_at"),
        (EntityKind::Note, Field::UpdatedAt) => Some("updated_at"),
        (EntityKind::Category, Field::Id) => Some("id"),
        (EntityKind::Category, Field::Name) => Some("name"),
        (EntityKind::Category, Field::CreatedAt) => Some("created_at"),
        (EntityKind::Category, Field::Order) => Some("display_order"),
        (EntityKind::Tag, Field::Id) => Some("id"),
        (EntityKind::Tag, Field::Name) => Some("name"),
        (EntityKind::Tag, Field::CreatedAt) => Some("created_at"),
        (EntityKind::NoteTag, Field::NoteId) => Some("note_id"),
        (EntityKind::NoteTag, Field::TagId) => Some("tag_id"),
        _ => None,
    }
}

fn order_expression(kind: EntityKind, field: Field) -> Option<&'static str> {
    match (kind, field) {
        (EntityKind::Note, Field::CategoryId) => Some("COALESCE(category_id, 'default')"),
        (EntityKind::Category | EntityKind::Tag, Field::Name) => Some("name COLLATE BINARY"),
        _ => column_name(kind, field),
    }
}

fn primary_key_order(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::NoteTag => "note_id ASC, tag_id ASC",
        _ => "id ASC",
    }
}

fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Note => "notes",
        EntityKind::Category => "categories",
        EntityKind::Tag => "tags",
        EntityKind::NoteTag => "note_tags",
    }
}

fn select_columns(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Note => NOTE_COLUMNS,
        EntityKind::Category => CATEGORY_COLUMNS,
        EntityKind::Tag => TAG_COLUMNS,
        EntityKind::NoteTag => RELATION_COLUMNS,
    }
}

fn record_from_row(kind: EntityKind, row: &Row<'_>) -> BackendResult<Record> {
    let record = match kind {
        EntityKind::Note => Record::Note(note_from_row(row)?),
        EntityKind::Category => Record::Category(Category {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            color: row.get("color")?,
            icon: row.get("icon")?,
            created_at: row.get("created_at")?,
            order: row.get("display_order")?,
        }),
        EntityKind::Tag => {
            let id: String = row.get("id")?;
            let usage_count: i64 = row.get("usage_count")?;
            let usage_count = u64::try_from(usage_count).map_err(|_| {
                BackendError::InvalidData(format!("tag {id} has negative usage count"))
            })?;
            Record::Tag(Tag {
                id,
                name: row.get("name")?,
                color: row.get("color")?,
                usage_count,
                created_at: row.get("created_at")?,
            })
        }
        EntityKind::NoteTag => Record::NoteTag(NoteTag {
            note_id: row.get("note_id")?,
            tag_id: row.get("tag_id")?,
        }),
    };
    Ok(record)
}

fn note_from_row(row: &Row<'_>) -> BackendResult<Note> {
    let id: String = row.get("id")?;
    let priority_ordinal: i64 = row.get("priority")?;
    let priority = Priority::from_ordinal(priority_ordinal).ok_or_else(|| {
        BackendError::InvalidData(format!("note {id} has priority ordinal {priority_ordinal}"))
    })?;
    let sync_status_text: String = row.get("sync_status")?;
    let sync_status = SyncStatus::parse(&sync_status_text).ok_or_else(|| {
        BackendError::InvalidData(format!("note {id} has sync status `{sync_status_text}`"))
    })?;

    Ok(Note {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        category_id: row.get("category_id")?,
        tag_ids: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_favorite: row.get("is_favorite")?,
        is_archived: row.get("is_archived")?,
        priority,
        remind_at: row.get("remind_at")?,
        encrypted: row.get("encrypted")?,
        sync_status,
        last_synced_at: row.get("last_synced_at")?,
    })
}

//! Object store backend: schemaless key→document collections.
//!
//! # Responsibility
//! - Keep one JSON document per record, grouped by entity kind.
//! - Emulate secondary indexes through [`IndexManager`].
//! - Persist committed state as one JSON snapshot file (optional).
//!
//! # Invariants
//! - Records and indexes change together inside one transaction; a failed
//!   unit of work is undone from its undo log, indexes included.
//! - Snapshot files are replaced atomically (temp file + rename).
//! - Note documents never store `tagIds`; the relation collection is the
//!   single source of truth.

use super::query::{matches_all, order_and_page, ScanQuery};
use super::{
    BackendCapabilities, BackendError, BackendKind, BackendResult, StorageBackend, StorageOps,
    StorageRead, UnitOfWork,
};
use crate::config::StorageLocation;
use crate::error::{StoreError, StoreResult};
use crate::index::IndexManager;
use crate::model::{Category, EntityKind, Note, NoteTag, Record, Tag};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

const SNAPSHOT_FORMAT_VERSION: u32 = 1;

type Collections = BTreeMap<EntityKind, BTreeMap<String, Value>>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    format_version: u32,
    collections: &'a Collections,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    format_version: u32,
    #[serde(default)]
    collections: Collections,
}

#[derive(Debug, Default)]
struct ObjectState {
    collections: Collections,
    indexes: IndexManager,
}

impl ObjectState {
    /// Writes or removes one raw document and keeps indexes in step.
    ///
    /// Returns the previous document so callers can undo the write.
    fn set_raw(
        &mut self,
        kind: EntityKind,
        key: &str,
        value: Option<Value>,
    ) -> BackendResult<Option<Value>> {
        let current = value
            .as_ref()
            .map(|value| decode(kind, value))
            .transpose()?;
        let collection = self.collections.entry(kind).or_default();
        let previous = match value {
            Some(value) => collection.insert(key.to_string(), value),
            None => collection.remove(key),
        };
        let previous_record = previous
            .as_ref()
            .map(|value| decode(kind, value))
            .transpose()?;

        match (previous_record.as_ref(), current.as_ref()) {
            (old, Some(new)) => self.indexes.on_put(old, new),
            (Some(old), None) => self.indexes.on_delete(old),
            (None, None) => {}
        }
        Ok(previous)
    }

    fn get(&self, kind: EntityKind, key: &str) -> BackendResult<Option<Record>> {
        self.collections
            .get(&kind)
            .and_then(|collection| collection.get(key))
            .map(|value| decode(kind, value))
            .transpose()
    }

    fn scan(&self, query: &ScanQuery) -> BackendResult<Vec<Record>> {
        let Some(collection) = self.collections.get(&query.kind) else {
            return Ok(Vec::new());
        };

        let plan = self.indexes.plan(query.kind, &query.predicates);
        let mut records = Vec::new();
        match plan.candidates {
            Some(keys) => {
                for key in keys {
                    if let Some(value) = collection.get(&key) {
                        let record = decode(query.kind, value)?;
                        if matches_all(&record, plan.residual.iter().copied()) {
                            records.push(record);
                        }
                    }
                }
            }
            None => {
                for value in collection.values() {
                    let record = decode(query.kind, value)?;
                    if matches_all(&record, plan.residual.iter().copied()) {
                        records.push(record);
                    }
                }
            }
        }

        Ok(order_and_page(records, query))
    }

    fn count(&self, kind: EntityKind) -> u64 {
        self.collections
            .get(&kind)
            .map_or(0, |collection| collection.len() as u64)
    }

    fn keys(&self, kind: EntityKind) -> Vec<String> {
        self.collections
            .get(&kind)
            .map(|collection| collection.keys().cloned().collect())
            .unwrap_or_default()
    }
}

type UndoEntry = (EntityKind, String, Option<Value>);

/// Write handle for one object-store unit of work.
struct ObjectTx<'s> {
    state: &'s mut ObjectState,
    undo: Vec<UndoEntry>,
}

impl StorageRead for ObjectTx<'_> {
    fn get(&self, kind: EntityKind, key: &str) -> BackendResult<Option<Record>> {
        self.state.get(kind, key)
    }

    fn scan(&self, query: &ScanQuery) -> BackendResult<Vec<Record>> {
        self.state.scan(query)
    }

    fn count(&self, kind: EntityKind) -> BackendResult<u64> {
        Ok(self.state.count(kind))
    }
}

impl StorageOps for ObjectTx<'_> {
    fn put(&mut self, record: &Record) -> BackendResult<String> {
        record.validate()?;
        let kind = record.kind();
        let key = record.key();
        let value = encode(record)?;
        let previous = self.state.set_raw(kind, &key, Some(value))?;
        self.undo.push((kind, key.clone(), previous));
        Ok(key)
    }

    fn delete(&mut self, kind: EntityKind, key: &str) -> BackendResult<()> {
        let exists = self
            .state
            .collections
            .get(&kind)
            .is_some_and(|collection| collection.contains_key(key));
        if !exists {
            return Ok(());
        }
        let previous = self.state.set_raw(kind, key, None)?;
        self.undo.push((kind, key.to_string(), previous));
        Ok(())
    }

    fn clear_all(&mut self) -> BackendResult<()> {
        for kind in EntityKind::ALL.iter().rev() {
            for key in self.state.keys(*kind) {
                self.delete(*kind, &key)?;
            }
        }
        Ok(())
    }
}

/// Schemaless document backend with emulated secondary indexes.
#[derive(Debug)]
pub struct ObjectStore {
    location: StorageLocation,
    state: ObjectState,
    initialized: bool,
}

impl ObjectStore {
    pub fn new(location: StorageLocation) -> Self {
        Self {
            location,
            state: ObjectState::default(),
            initialized: false,
        }
    }

    fn snapshot_path(&self) -> Option<&Path> {
        match &self.location {
            StorageLocation::InMemory => None,
            StorageLocation::Path(path) => Some(path.as_path()),
        }
    }

    fn load_snapshot(&mut self, path: &Path) -> BackendResult<()> {
        let bytes = std::fs::read(path)?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(BackendError::InvalidData(format!(
                "snapshot format version {} is newer than supported {}",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        let mut state = ObjectState::default();
        for (kind, collection) in snapshot.collections {
            for (key, value) in collection {
                let record = decode(kind, &value)?;
                if record.key() != key {
                    return Err(BackendError::InvalidData(format!(
                        "{} document stored under `{key}` has key `{}`",
                        kind.as_str(),
                        record.key()
                    )));
                }
                state.set_raw(kind, &key, Some(value))?;
            }
        }
        self.state = state;
        Ok(())
    }

    fn persist(&self) -> BackendResult<()> {
        let Some(path) = self.snapshot_path() else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(&SnapshotRef {
            format_version: SNAPSHOT_FORMAT_VERSION,
            collections: &self.state.collections,
        })?;
        let tmp_path = temp_path_for(path);
        std::fs::write(&tmp_path, bytes)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn rollback(&mut self, undo: Vec<UndoEntry>) {
        for (kind, key, previous) in undo.into_iter().rev() {
            if let Err(err) = self.state.set_raw(kind, &key, previous) {
                error!(
                    "event=tx_rollback module=object_store status=error kind={} error={}",
                    kind.as_str(),
                    err
                );
            }
        }
    }
}

impl StorageRead for ObjectStore {
    fn get(&self, kind: EntityKind, key: &str) -> BackendResult<Option<Record>> {
        ensure_initialized(self.initialized)?;
        self.state.get(kind, key)
    }

    fn scan(&self, query: &ScanQuery) -> BackendResult<Vec<Record>> {
        ensure_initialized(self.initialized)?;
        self.state.scan(query)
    }

    fn count(&self, kind: EntityKind) -> BackendResult<u64> {
        ensure_initialized(self.initialized)?;
        Ok(self.state.count(kind))
    }
}

impl StorageBackend for ObjectStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Object
    }

    fn initialize(&mut self) -> BackendResult<()> {
        if self.initialized {
            return Ok(());
        }

        let started_at = Instant::now();
        if let Some(path) = self.snapshot_path().map(Path::to_path_buf) {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            if path.exists() {
                self.load_snapshot(&path)?;
            }
        }

        self.initialized = true;
        info!(
            "event=backend_init module=object_store status=ok mode={} notes={} duration_ms={}",
            self.location.mode(),
            self.state.count(EntityKind::Note),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            native_search: false,
            native_indexes: false,
        }
    }

    fn transaction(&mut self, work: &mut UnitOfWork<'_>) -> StoreResult<()> {
        if !self.initialized {
            return Err(StoreError::StorageNotInitialized);
        }

        let (result, undo) = {
            let mut tx = ObjectTx {
                state: &mut self.state,
                undo: Vec::new(),
            };
            let result = work(&mut tx);
            (result, tx.undo)
        };

        match result {
            Ok(()) => {
                if undo.is_empty() {
                    return Ok(());
                }
                if let Err(err) = self.persist() {
                    error!("event=tx_commit module=object_store status=error error={err}");
                    self.rollback(undo);
                    return Err(err.into());
                }
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=tx_rollback module=object_store status=ok writes={} error_code={}",
                    undo.len(),
                    err.code()
                );
                self.rollback(undo);
                Err(err)
            }
        }
    }

    fn search_native(&self, _text: &str, _limit: Option<u32>) -> BackendResult<Vec<String>> {
        Err(BackendError::SearchUnavailable(
            "object store has no full-text index".to_string(),
        ))
    }

    fn close(&mut self) -> BackendResult<()> {
        if self.initialized {
            self.persist()?;
        }
        self.state = ObjectState::default();
        self.initialized = false;
        info!("event=backend_close module=object_store status=ok");
        Ok(())
    }
}

fn ensure_initialized(initialized: bool) -> BackendResult<()> {
    if initialized {
        Ok(())
    } else {
        Err(BackendError::NotInitialized)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn encode(record: &Record) -> BackendResult<Value> {
    let value = match record {
        Record::Note(note) => {
            let mut value = serde_json::to_value(note)?;
            if let Some(object) = value.as_object_mut() {
                object.remove("tagIds");
            }
            value
        }
        Record::Category(category) => serde_json::to_value(category)?,
        Record::Tag(tag) => serde_json::to_value(tag)?,
        Record::NoteTag(relation) => serde_json::to_value(relation)?,
    };
    Ok(value)
}

fn decode(kind: EntityKind, value: &Value) -> BackendResult<Record> {
    let record = match kind {
        EntityKind::Note => Record::Note(Note::deserialize(value)?),
        EntityKind::Category => Record::Category(Category::deserialize(value)?),
        EntityKind::Tag => Record::Tag(Tag::deserialize(value)?),
        EntityKind::NoteTag => Record::NoteTag(NoteTag::deserialize(value)?),
    };
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::{ObjectStore, ObjectTx};
    use crate::backend::{StorageBackend, StorageOps, StorageRead};
    use crate::config::StorageLocation;
    use crate::error::StoreError;
    use crate::model::{Category, EntityKind, Record};

    fn category(id: &str, name: &str) -> Record {
        let mut category = Category::default_category(1);
        category.id = id.to_string();
        category.name = name.to_string();
        Record::Category(category)
    }

    #[test]
    fn operations_before_initialize_fail() {
        let store = ObjectStore::new(StorageLocation::InMemory);
        assert!(store.get(EntityKind::Category, "default").is_err());
    }

    #[test]
    fn failed_unit_of_work_is_undone() {
        let mut store = ObjectStore::new(StorageLocation::InMemory);
        store.initialize().unwrap();
        StorageBackend::put(&mut store, &category("a", "A")).unwrap();

        let result = store.transaction(&mut |ops| {
            ops.put(&category("b", "B"))?;
            ops.delete(EntityKind::Category, "a")?;
            Err(StoreError::ConstraintViolation("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(store.get(EntityKind::Category, "a").unwrap().is_some());
        assert!(store.get(EntityKind::Category, "b").unwrap().is_none());
    }

    #[test]
    fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        {
            let mut store = ObjectStore::new(StorageLocation::Path(path.clone()));
            store.initialize().unwrap();
            StorageBackend::put(&mut store, &category("a", "A")).unwrap();
            store.close().unwrap();
        }

        let mut reopened = ObjectStore::new(StorageLocation::Path(path));
        reopened.initialize().unwrap();
        assert_eq!(reopened.count(EntityKind::Category).unwrap(), 1);
    }

    #[test]
    fn delete_of_missing_key_records_no_undo() {
        let mut store = ObjectStore::new(StorageLocation::InMemory);
        store.initialize().unwrap();
        let mut tx = ObjectTx {
            state: &mut store.state,
            undo: Vec::new(),
        };
        tx.delete(EntityKind::Tag, "missing").unwrap();
        assert!(tx.undo.is_empty());
    }
}

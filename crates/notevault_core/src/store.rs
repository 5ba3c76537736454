//! Repository façade over the configured storage backend.
//!
//! # Responsibility
//! - Own the backend, the search engine and the analytics recorder.
//! - Expose note, category, tag, search, transfer and stats operations.
//! - Emit one metadata-only log line per operation.
//!
//! # Invariants
//! - Mutations take `&mut self` and run as one backend unit of work, so
//!   writers never interleave.
//! - Every operation except `get_stats` fails with `StorageNotInitialized`
//!   before `initialize()` succeeds.
//! - Analytics events are recorded only after a mutation committed.

use crate::analytics::AnalyticsRecorder;
use crate::backend::{BackendKind, ObjectStore, RelationalStore, StorageBackend};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::{
    Category, CategoryDraft, CategoryPatch, EntityKind, Note, NoteDraft, NotePatch, Tag, TagDraft,
    TagPatch,
};
use crate::repo::{catalog_repo, note_repo, NoteListQuery};
use crate::search::{SearchEngine, SearchQuery};
use crate::service::{
    transfer_service, CatalogService, ExportDocument, ImportSummary, NoteService,
};
use log::{error, info};
use serde_json::json;
use std::time::Instant;

/// Entity counts plus the initialization flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub note_count: u64,
    pub category_count: u64,
    pub tag_count: u64,
    pub initialized: bool,
}

/// Handle to one note store.
pub struct NoteStore {
    config: StoreConfig,
    backend: Box<dyn StorageBackend>,
    search: SearchEngine,
    analytics: AnalyticsRecorder,
}

impl NoteStore {
    /// Builds a store for `config`. No I/O happens until [`Self::initialize`].
    pub fn open(config: StoreConfig) -> Self {
        let backend: Box<dyn StorageBackend> = match config.backend {
            BackendKind::Object => Box::new(ObjectStore::new(config.location.clone())),
            BackendKind::Relational => Box::new(RelationalStore::new(config.location.clone())),
        };
        let analytics = AnalyticsRecorder::with_capacity(config.analytics_capacity);
        Self {
            config,
            backend,
            search: SearchEngine::default(),
            analytics,
        }
    }

    /// Opens the backend, probes capabilities and seeds defaults once.
    /// Idempotent.
    pub fn initialize(&mut self) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = self.initialize_inner();
        log_outcome("store_init", started_at, &result, || {
            format!(
                "backend={} native_search={}",
                self.config.backend.as_str(),
                self.search.supports_native_search()
            )
        });
        result
    }

    fn initialize_inner(&mut self) -> StoreResult<()> {
        self.backend.initialize()?;
        let capabilities = self.backend.capabilities();
        self.search = SearchEngine::new(capabilities.native_search && self.config.native_search);

        let seed_categories = self.config.seed_categories.clone();
        let seed_tags = self.config.seed_tags.clone();
        CatalogService::new(self.backend.as_mut()).seed_defaults(&seed_categories, &seed_tags)?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }

    /// Releases the backend. `initialize()` must run again before reuse.
    pub fn close(&mut self) -> StoreResult<()> {
        self.backend.close()?;
        self.search = SearchEngine::default();
        info!("event=store_close module=store status=ok");
        Ok(())
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Capability flag fixed by the last `initialize()`.
    pub fn supports_native_search(&self) -> bool {
        self.search.supports_native_search()
    }

    pub fn analytics(&self) -> &AnalyticsRecorder {
        &self.analytics
    }

    // Notes

    pub fn create_note(&mut self, draft: NoteDraft) -> StoreResult<Note> {
        let started_at = Instant::now();
        let result = NoteService::new(self.backend.as_mut()).create_note(&draft);
        log_outcome("note_create", started_at, &result, || match &result {
            Ok(note) => format!("note_id={} tags={}", note.id, note.tag_ids.len()),
            Err(_) => String::new(),
        });
        if let Ok(note) = &result {
            self.analytics.record(
                "note_created",
                json!({ "noteId": note.id, "tagCount": note.tag_ids.len() }),
            );
        }
        result
    }

    pub fn update_note(&mut self, note_id: &str, patch: NotePatch) -> StoreResult<Note> {
        let started_at = Instant::now();
        let result = NoteService::new(self.backend.as_mut()).update_note(note_id, &patch);
        log_outcome("note_update", started_at, &result, || format!("note_id={note_id}"));
        if result.is_ok() {
            self.analytics.record(
                "note_updated",
                json!({ "noteId": note_id, "tagsReplaced": patch.tag_ids.is_some() }),
            );
        }
        result
    }

    /// Deletes a note and its relations. Missing ids are a no-op.
    pub fn delete_note(&mut self, note_id: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = NoteService::new(self.backend.as_mut()).delete_note(note_id);
        log_outcome("note_delete", started_at, &result, || format!("note_id={note_id}"));
        if let Ok(true) = result {
            self.analytics
                .record("note_deleted", json!({ "noteId": note_id }));
        }
        result.map(|_| ())
    }

    pub fn get_note(&self, note_id: &str) -> StoreResult<Option<Note>> {
        Ok(note_repo::load_note(self.backend.as_ref(), note_id)?)
    }

    pub fn list_notes(&self, query: &NoteListQuery) -> StoreResult<Vec<Note>> {
        let started_at = Instant::now();
        let result = note_repo::list_notes(self.backend.as_ref(), query).map_err(StoreError::from);
        log_outcome("note_list", started_at, &result, || match &result {
            Ok(notes) => format!("rows={}", notes.len()),
            Err(_) => String::new(),
        });
        result
    }

    /// Replaces a note's tags by tag id.
    pub fn set_note_tags(&mut self, note_id: &str, tag_ids: &[String]) -> StoreResult<Note> {
        let started_at = Instant::now();
        let result = NoteService::new(self.backend.as_mut()).set_note_tags(note_id, tag_ids);
        log_outcome("note_set_tags", started_at, &result, || format!("note_id={note_id}"));
        let (note, diff) = result?;
        self.analytics.record(
            "note_tags_set",
            json!({ "noteId": note_id, "added": diff.added.len(), "removed": diff.removed.len() }),
        );
        Ok(note)
    }

    /// Replaces a note's tags by name, creating tags that do not exist yet.
    pub fn tag_note_by_names(&mut self, note_id: &str, names: &[String]) -> StoreResult<Note> {
        let started_at = Instant::now();
        let result = NoteService::new(self.backend.as_mut()).tag_note_by_names(note_id, names);
        log_outcome("note_tag_by_names", started_at, &result, || {
            format!("note_id={note_id} names={}", names.len())
        });
        let (note, diff) = result?;
        self.analytics.record(
            "note_tags_set",
            json!({ "noteId": note_id, "added": diff.added.len(), "removed": diff.removed.len() }),
        );
        Ok(note)
    }

    // Search

    /// Searches title and content, archived notes included, no limit.
    pub fn search_notes(&mut self, text: &str) -> StoreResult<Vec<Note>> {
        self.search_notes_with(&SearchQuery::new(text))
    }

    pub fn search_notes_with(&mut self, query: &SearchQuery) -> StoreResult<Vec<Note>> {
        let started_at = Instant::now();
        let result = self.search.search(self.backend.as_ref(), query);
        log_outcome("note_search", started_at, &result, || match &result {
            Ok(outcome) => format!(
                "path={} rows={} query_chars={}",
                outcome.path.as_str(),
                outcome.notes.len(),
                query.text.chars().count()
            ),
            Err(_) => String::new(),
        });
        let outcome = result?;
        self.analytics.record(
            "notes_searched",
            json!({ "path": outcome.path.as_str(), "results": outcome.notes.len() }),
        );
        Ok(outcome.notes)
    }

    // Categories

    pub fn create_category(&mut self, draft: CategoryDraft) -> StoreResult<Category> {
        let started_at = Instant::now();
        let result = CatalogService::new(self.backend.as_mut()).create_category(&draft);
        log_outcome("category_create", started_at, &result, || match &result {
            Ok(category) => format!("category_id={}", category.id),
            Err(_) => String::new(),
        });
        if let Ok(category) = &result {
            self.analytics
                .record("category_created", json!({ "categoryId": category.id }));
        }
        result
    }

    pub fn update_category(&mut self, category_id: &str, patch: CategoryPatch) -> StoreResult<Category> {
        let started_at = Instant::now();
        let result = CatalogService::new(self.backend.as_mut()).update_category(category_id, &patch);
        log_outcome("category_update", started_at, &result, || {
            format!("category_id={category_id}")
        });
        if result.is_ok() {
            self.analytics
                .record("category_updated", json!({ "categoryId": category_id }));
        }
        result
    }

    /// Deletes a category; its notes move to the default category.
    ///
    /// Deleting `default` fails with `ConstraintViolation`; unknown ids are a
    /// no-op.
    pub fn delete_category(&mut self, category_id: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = CatalogService::new(self.backend.as_mut()).delete_category(category_id);
        log_outcome("category_delete", started_at, &result, || {
            format!("category_id={category_id}")
        });
        if let Some(reassigned) = result? {
            self.analytics.record(
                "category_deleted",
                json!({ "categoryId": category_id, "reassignedNotes": reassigned }),
            );
        }
        Ok(())
    }

    pub fn get_category(&self, category_id: &str) -> StoreResult<Option<Category>> {
        Ok(catalog_repo::load_category(self.backend.as_ref(), category_id)?)
    }

    /// Categories ordered by `order`, then name.
    pub fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(catalog_repo::list_categories(self.backend.as_ref())?)
    }

    // Tags

    pub fn create_tag(&mut self, draft: TagDraft) -> StoreResult<Tag> {
        let started_at = Instant::now();
        let result = CatalogService::new(self.backend.as_mut()).create_tag(&draft);
        log_outcome("tag_create", started_at, &result, || match &result {
            Ok(tag) => format!("tag_id={}", tag.id),
            Err(_) => String::new(),
        });
        if let Ok(tag) = &result {
            self.analytics
                .record("tag_created", json!({ "tagId": tag.id }));
        }
        result
    }

    pub fn update_tag(&mut self, tag_id: &str, patch: TagPatch) -> StoreResult<Tag> {
        let started_at = Instant::now();
        let result = CatalogService::new(self.backend.as_mut()).update_tag(tag_id, &patch);
        log_outcome("tag_update", started_at, &result, || format!("tag_id={tag_id}"));
        if result.is_ok() {
            self.analytics
                .record("tag_updated", json!({ "tagId": tag_id }));
        }
        result
    }

    /// Deletes a tag and detaches it from every note. Unknown ids are a no-op.
    pub fn delete_tag(&mut self, tag_id: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = CatalogService::new(self.backend.as_mut()).delete_tag(tag_id);
        log_outcome("tag_delete", started_at, &result, || format!("tag_id={tag_id}"));
        if let Some(detached) = result? {
            self.analytics.record(
                "tag_deleted",
                json!({ "tagId": tag_id, "detachedNotes": detached }),
            );
        }
        Ok(())
    }

    pub fn get_tag(&self, tag_id: &str) -> StoreResult<Option<Tag>> {
        Ok(catalog_repo::load_tag(self.backend.as_ref(), tag_id)?)
    }

    /// Tags ordered by name.
    pub fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(catalog_repo::list_tags(self.backend.as_ref())?)
    }

    /// Looks a tag up by name after normalization.
    pub fn find_tag_by_name(&self, name: &str) -> StoreResult<Option<Tag>> {
        match crate::model::normalize_tag_name(name) {
            Some(name) => Ok(catalog_repo::find_tag_by_name(self.backend.as_ref(), &name)?),
            None => Ok(None),
        }
    }

    // Transfer

    pub fn export_all(&mut self) -> StoreResult<ExportDocument> {
        let started_at = Instant::now();
        let result = transfer_service::export_document(self.backend.as_ref());
        log_outcome("store_export", started_at, &result, || match &result {
            Ok(document) => format!(
                "notes={} categories={} tags={} relations={}",
                document.notes.len(),
                document.categories.len(),
                document.tags.len(),
                document.relations.len()
            ),
            Err(_) => String::new(),
        });
        if let Ok(document) = &result {
            self.analytics
                .record("store_exported", json!({ "notes": document.notes.len() }));
        }
        result
    }

    pub fn export_json(&mut self) -> StoreResult<String> {
        let document = self.export_all()?;
        transfer_service::document_to_json(&document)
    }

    /// Replaces the whole store with `document`. All-or-nothing.
    pub fn import_all(&mut self, document: &ExportDocument) -> StoreResult<ImportSummary> {
        let started_at = Instant::now();
        let result = transfer_service::import_document(self.backend.as_mut(), document);
        log_outcome("store_import", started_at, &result, || match &result {
            Ok(summary) => format!(
                "notes={} categories={} tags={} relations={}",
                summary.notes, summary.categories, summary.tags, summary.relations
            ),
            Err(_) => String::new(),
        });
        if let Ok(summary) = &result {
            self.analytics.record(
                "store_imported",
                json!({ "notes": summary.notes, "relations": summary.relations }),
            );
        }
        result
    }

    pub fn import_json(&mut self, text: &str) -> StoreResult<ImportSummary> {
        let document = transfer_service::parse_document(text)?;
        self.import_all(&document)
    }

    /// Removes every record, then seeds defaults again.
    pub fn clear_all(&mut self) -> StoreResult<()> {
        let started_at = Instant::now();
        let seed_categories = self.config.seed_categories.clone();
        let seed_tags = self.config.seed_tags.clone();
        let now = crate::clock::now_ms();
        let result = self.backend.transaction(&mut |ops| {
            ops.clear_all()?;
            crate::service::catalog_service::seed_defaults_in(ops, &seed_categories, &seed_tags, now)?;
            Ok(())
        });
        log_outcome("store_clear", started_at, &result, String::new);
        result?;
        self.analytics.record("store_cleared", json!({}));
        Ok(())
    }

    /// Entity counts. Works before initialization, reporting zeros.
    pub fn get_stats(&self) -> StoreResult<StoreStats> {
        if !self.backend.is_initialized() {
            return Ok(StoreStats::default());
        }
        Ok(StoreStats {
            note_count: self.backend.count(EntityKind::Note)?,
            category_count: self.backend.count(EntityKind::Category)?,
            tag_count: self.backend.count(EntityKind::Tag)?,
            initialized: true,
        })
    }
}

fn log_outcome<T>(
    event: &str,
    started_at: Instant,
    result: &StoreResult<T>,
    details: impl FnOnce() -> String,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event={event} module=store status=ok duration_ms={duration_ms} {}",
            details()
        ),
        Err(err) => error!(
            "event={event} module=store status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
}

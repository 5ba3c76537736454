//! Note search with native full-text preference and substring fallback.
//!
//! # Responsibility
//! - Route queries to the backend's full-text index when allowed.
//! - Recover every native failure by scanning with a case-insensitive
//!   substring match over title and content.
//!
//! # Invariants
//! - Blank queries return no notes and read no records, but still require
//!   an initialized backend.
//! - `SearchUnavailable` never escapes this module.
//! - Native and fallback paths return the same match set; only ordering may
//!   differ.

use crate::backend::{StorageBackend, StorageRead};
use crate::db::fts::TRIGRAM_MIN_CHARS;
use crate::error::{StoreError, StoreResult};
use crate::model::Note;
use crate::repo::note_repo::{all_notes_recent_first, load_notes_in_order};
use log::{debug, warn};

/// User search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub limit: Option<u32>,
    pub include_archived: bool,
}

impl SearchQuery {
    /// Unlimited query that includes archived notes.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: None,
            include_archived: true,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn include_archived(mut self, value: bool) -> Self {
        self.include_archived = value;
        self
    }
}

/// Which path answered a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPath {
    /// Nothing to search for.
    Skipped,
    Native,
    Fallback,
}

impl SearchPath {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Native => "native",
            Self::Fallback => "fallback",
        }
    }
}

/// Search result plus the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    pub notes: Vec<Note>,
    pub path: SearchPath,
}

/// Search router. Its native capability is fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchEngine {
    native: bool,
}

impl SearchEngine {
    /// `native` should be the backend capability AND the configuration toggle.
    pub fn new(native: bool) -> Self {
        Self { native }
    }

    pub fn supports_native_search(&self) -> bool {
        self.native
    }

    pub fn search<B>(&self, backend: &B, query: &SearchQuery) -> StoreResult<SearchOutcome>
    where
        B: StorageBackend + ?Sized,
    {
        if !backend.is_initialized() {
            return Err(StoreError::StorageNotInitialized);
        }
        let text = query.text.trim();
        if text.is_empty() {
            return Ok(SearchOutcome {
                notes: Vec::new(),
                path: SearchPath::Skipped,
            });
        }

        if self.native {
            if text.chars().count() < TRIGRAM_MIN_CHARS {
                debug!(
                    "event=search_route module=search status=fallback reason=query_too_short"
                );
            } else {
                match search_native(backend, text, query) {
                    Ok(notes) => {
                        return Ok(SearchOutcome {
                            notes,
                            path: SearchPath::Native,
                        })
                    }
                    Err(err) => {
                        warn!("event=search_route module=search status=fallback error={err}");
                    }
                }
            }
        }

        let notes = search_substring(backend, text, query)?;
        Ok(SearchOutcome {
            notes,
            path: SearchPath::Fallback,
        })
    }
}

fn search_native<B>(
    backend: &B,
    text: &str,
    query: &SearchQuery,
) -> crate::backend::BackendResult<Vec<Note>>
where
    B: StorageBackend + ?Sized,
{
    let native_limit = if query.include_archived {
        query.limit
    } else {
        None
    };
    let ranked_ids = backend.search_native(text, native_limit)?;
    let notes = load_notes_in_order(backend, &ranked_ids)?;
    Ok(finish(notes, query))
}

/// Case-insensitive substring scan, most recently updated first.
pub fn search_substring<R>(store: &R, text: &str, query: &SearchQuery) -> StoreResult<Vec<Note>>
where
    R: StorageRead + ?Sized,
{
    let needle = fold_case(text.trim());
    if needle.is_empty() {
        return Ok(Vec::new());
    }
    let notes = all_notes_recent_first(store, query.include_archived)?
        .into_iter()
        .filter(|note| matches_substring(note, &needle))
        .collect();
    Ok(finish(notes, query))
}

fn matches_substring(note: &Note, folded_needle: &str) -> bool {
    fold_case(&note.title).contains(folded_needle)
        || fold_case(&note.content).contains(folded_needle)
}

/// Per-character lowercase, with final sigma folded to `σ`.
///
/// `str::to_lowercase` picks `ς` at word ends, so a prefix and its longer
/// word would fold differently; the trigram index folds each character alone.
fn fold_case(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|ch| if ch == 'ς' { 'σ' } else { ch })
        .collect()
}

fn finish(notes: Vec<Note>, query: &SearchQuery) -> Vec<Note> {
    let limit = query.limit.map_or(usize::MAX, |limit| limit as usize);
    notes
        .into_iter()
        .filter(|note| query.include_archived || !note.is_archived)
        .take(limit)
        .collect()
}

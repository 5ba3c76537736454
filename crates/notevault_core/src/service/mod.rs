//! Write use-cases over the storage contract.
//!
//! # Responsibility
//! - Run each mutation as one backend unit of work.
//! - Keep the relation and catalog invariants in one place, independent of
//!   the backend strategy.

pub mod catalog_service;
pub mod note_service;
pub mod transfer_service;

pub use catalog_service::CatalogService;
pub use note_service::NoteService;
pub use transfer_service::{ExportDocument, ImportSummary, EXPORT_FORMAT_VERSION};

//! Limpieza de contenedores ZIP (Office OpenXML y OpenDocument) por eliminación de entradas.

mod archive;
mod clean;
mod verify;

pub use archive::{EntryDecision, RewriteSummary, rewrite_archive_bytes};
pub use clean::remove_container_metadata;
pub use verify::verify_container_clean;

pub(crate) use clean::entry_decision;

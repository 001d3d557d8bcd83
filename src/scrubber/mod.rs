//! Funciones para eliminar metadata identificable de archivos soportados.

pub mod classify;
pub mod constants;
mod directory_cleanup;
mod image;
pub mod office;
mod pdf;
mod removal;
pub mod replace;
mod utils;

pub use classify::{
    Classification, ContainerFamily, ScrubJob, SkipReason, Strategy, classify, classify_explicit,
};
pub use directory_cleanup::{
    BatchReport, CleanupEvent, FailedFile, RunReport, ScrubOutcome, collect_candidate_files, run,
    run_cleanup, run_cleanup_with_sender,
};
pub use self::image::{remove_image_metadata, verify_image_metadata_clean};
pub use pdf::{LopdfCleaner, PdfCleaner};
pub use removal::Scrubber;
pub use replace::{CommitOutcome, CommitReport, FileMover, Replacer, StdMover};
pub use utils::{backup_path, secondary_staged_path, staged_path};

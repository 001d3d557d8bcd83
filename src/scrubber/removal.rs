//! Despacho de la limpieza según la estrategia resuelta para cada archivo.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ExtensionFilter, ScrubConfig};
use crate::error::ScrubError;

use super::classify::{ScrubJob, Strategy, classify_explicit};
use super::image::remove_image_metadata;
use super::office::remove_container_metadata;
use super::pdf::{LopdfCleaner, PdfCleaner};
use super::replace::{CommitReport, Replacer};
use super::utils::staged_path;

/// Limpiador compartido por todos los trabajadores; no guarda estado mutable.
#[derive(Clone)]
pub struct Scrubber {
    replacer: Replacer,
    pdf: Option<Arc<dyn PdfCleaner>>,
}

impl Scrubber {
    pub fn new(replacer: Replacer) -> Self {
        Self {
            replacer,
            pdf: None,
        }
    }

    /// Construye el limpiador y registra la capacidad PDF solo si la configuración la pide.
    pub fn from_config(config: &ScrubConfig) -> Self {
        let scrubber = Self::new(Replacer::new(config.backup, config.retry_delay));
        if config.with_pdf {
            scrubber.with_pdf_cleaner(Arc::new(LopdfCleaner))
        } else {
            scrubber
        }
    }

    pub fn with_pdf_cleaner(mut self, cleaner: Arc<dyn PdfCleaner>) -> Self {
        self.pdf = Some(cleaner);
        self
    }

    pub fn supports_pdf(&self) -> bool {
        self.pdf.is_some()
    }

    pub fn scrub(&self, job: &ScrubJob) -> Result<CommitReport, ScrubError> {
        tracing::debug!(path = %job.path.display(), strategy = job.strategy.label(), "procesando");

        match job.strategy {
            Strategy::Container(family) => {
                remove_container_metadata(&job.path, family, &self.replacer)
            }
            Strategy::Image => remove_image_metadata(&job.path, &self.replacer),
            Strategy::Pdf => self.remove_pdf_metadata(&job.path).map_err(|e| e.at(&job.path)),
        }
    }

    /// Limpia un único archivo indicado explícitamente; extensiones desconocidas son un error.
    pub fn scrub_path(&self, path: &Path) -> Result<CommitReport, ScrubError> {
        let job = classify_explicit(path, &ExtensionFilter::default()).map_err(|e| e.at(path))?;
        self.scrub(&job)
    }

    fn remove_pdf_metadata(&self, path: &Path) -> Result<CommitReport, ScrubError> {
        let Some(cleaner) = &self.pdf else {
            return Err(ScrubError::Unsupported(
                "se detectó un PDF; usa --with-pdf para habilitar su limpieza".to_string(),
            ));
        };

        let temp_path = staged_path(path);
        if let Err(error) = cleaner.clean(path, &temp_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(error);
        }

        self.replacer.commit(path, &temp_path)
    }
}

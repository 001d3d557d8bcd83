//! Configuración fija de una ejecución de limpieza.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::ScrubError;
use crate::scrubber::constants::{DEFAULT_RETRY_DELAY, MIN_WORKERS};

/// Listas de extensiones a incluir o excluir, ya normalizadas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl ExtensionFilter {
    /// Construye el filtro a partir de listas separadas por comas (`"docx, .XLSX"`).
    pub fn parse(include: &str, exclude: &str) -> Result<Self, ScrubError> {
        let filter = Self {
            include: parse_extension_list(include)?,
            exclude: parse_extension_list(exclude)?,
        };

        for ext in filter.include.intersection(&filter.exclude) {
            tracing::warn!(
                extension = %ext,
                "extensión incluida y excluida a la vez; prevalece la exclusión"
            );
        }

        Ok(filter)
    }

    /// `include` se evalúa primero; `exclude` descarta aunque la extensión esté incluida.
    pub fn allows(&self, ext: &str) -> bool {
        if !self.include.is_empty() && !self.include.contains(ext) {
            return false;
        }
        !self.exclude.contains(ext)
    }
}

pub fn parse_extension_list(raw: &str) -> Result<BTreeSet<String>, ScrubError> {
    let mut set = BTreeSet::new();

    for token in raw.split(',') {
        let token = token.trim().trim_start_matches('.').to_lowercase();
        if token.is_empty() {
            continue;
        }
        if token.contains(['/', '\\']) || token.contains(char::is_whitespace) {
            return Err(ScrubError::Config(format!(
                "extensión no válida en la lista: `{}`",
                token
            )));
        }
        set.insert(token);
    }

    Ok(set)
}

#[derive(Clone, Debug)]
pub struct ScrubConfig {
    /// Conserva una copia `.bak` del archivo antes de reemplazarlo.
    pub backup: bool,
    pub dry_run: bool,
    pub workers: usize,
    /// Registra el limpiador de PDF al arrancar.
    pub with_pdf: bool,
    pub filter: ExtensionFilter,
    /// Espera antes de reintentar un renombrado fallido.
    pub retry_delay: Duration,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            backup: true,
            dry_run: false,
            workers: default_workers(),
            with_pdf: false,
            filter: ExtensionFilter::default(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl ScrubConfig {
    /// Número de trabajadores efectivo, nunca inferior al mínimo.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(MIN_WORKERS)
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_WORKERS)
        .max(MIN_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lists_case_insensitively_without_dots() -> Result<(), ScrubError> {
        let filter = ExtensionFilter::parse(" .DOCX, xlsx,,pdf ", "")?;
        assert_eq!(
            filter.include.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["docx", "pdf", "xlsx"]
        );
        assert!(filter.exclude.is_empty());
        Ok(())
    }

    #[test]
    fn include_is_checked_before_exclude() -> Result<(), ScrubError> {
        let filter = ExtensionFilter::parse("docx,png", "png")?;
        assert!(filter.allows("docx"));
        assert!(!filter.allows("png"));
        assert!(!filter.allows("xlsx"));

        let open = ExtensionFilter::parse("", "jpg")?;
        assert!(open.allows("odt"));
        assert!(!open.allows("jpg"));
        Ok(())
    }

    #[test]
    fn rejects_tokens_that_look_like_paths() {
        let error = ExtensionFilter::parse("docs/x", "").unwrap_err();
        assert_eq!(error.kind(), "config");

        let error = ExtensionFilter::parse("", "do cx").unwrap_err();
        assert_eq!(error.kind(), "config");
    }

    #[test]
    fn workers_never_drop_below_minimum() {
        let config = ScrubConfig {
            workers: 0,
            ..ScrubConfig::default()
        };
        assert_eq!(config.effective_workers(), MIN_WORKERS);
        assert!(ScrubConfig::default().effective_workers() >= MIN_WORKERS);
        assert!(ScrubConfig::default().backup);
    }
}

//! Utilidades compartidas para derivar rutas auxiliares junto al archivo original.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::constants::{BACKUP_SUFFIX, SECONDARY_STAGED_SUFFIX, STAGED_SUFFIX};

/// Añade `.suffix` al nombre completo del archivo (`informe.docx` → `informe.docx.tmp`).
pub(crate) fn with_appended_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Ruta del archivo preparado que reemplazará al original.
pub fn staged_path(path: &Path) -> PathBuf {
    with_appended_suffix(path, STAGED_SUFFIX)
}

/// Ruta intermedia para limpiadores de varias etapas.
pub fn secondary_staged_path(path: &Path) -> PathBuf {
    with_appended_suffix(path, SECONDARY_STAGED_SUFFIX)
}

/// Primer candidato de respaldo: `<original>.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    with_appended_suffix(path, BACKUP_SUFFIX)
}

/// Candidato alternativo con marca de tiempo: `<original>.<unix>.bak`, con contador si hace falta.
pub fn timestamped_backup_path(path: &Path, timestamp: i64, attempt: u32) -> PathBuf {
    let stamp = if attempt == 0 {
        timestamp.to_string()
    } else {
        format!("{}-{}", timestamp, attempt)
    };
    with_appended_suffix(path, &format!("{}.{}", stamp, BACKUP_SUFFIX))
}

/// Extensión en minúsculas y sin el punto inicial.
pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
}

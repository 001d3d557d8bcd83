use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;

use crate::error::ScrubError;
use crate::scrubber::classify::ContainerFamily;
use crate::scrubber::constants::{OPENDOCUMENT_META_ENTRY, OPENXML_PROPERTIES_PREFIX};
use crate::scrubber::replace::{CommitReport, Replacer};
use crate::scrubber::utils::staged_path;

use super::archive::{EntryDecision, rewrite_archive_bytes};
use super::verify::verify_archive_clean;

/// Regla de cada familia: qué entradas contienen propiedades del documento.
pub(crate) fn entry_decision(family: ContainerFamily, name: &str) -> EntryDecision {
    let drop = match family {
        ContainerFamily::OpenXml => name.to_lowercase().starts_with(OPENXML_PROPERTIES_PREFIX),
        ContainerFamily::OpenDocument => name.eq_ignore_ascii_case(OPENDOCUMENT_META_ENTRY),
    };

    if drop {
        EntryDecision::Drop
    } else {
        EntryDecision::Keep
    }
}

/// Elimina las entradas de metadata de un documento Office u OpenDocument.
///
/// El contenedor se reescribe en memoria, se verifica, se escribe en `<original>.tmp`
/// y se confirma con el `Replacer`. Cualquier error sale etiquetado con `path`.
pub fn remove_container_metadata(
    path: &Path,
    family: ContainerFamily,
    replacer: &Replacer,
) -> Result<CommitReport, ScrubError> {
    stage_and_commit(path, family, replacer).map_err(|e| e.at(path))
}

fn stage_and_commit(
    path: &Path,
    family: ContainerFamily,
    replacer: &Replacer,
) -> Result<CommitReport, ScrubError> {
    let source = fs::read(path)?;
    let (staged, summary) = rewrite_archive_bytes(&source, |name| entry_decision(family, name))?;

    tracing::debug!(
        path = %path.display(),
        kept = summary.kept.len(),
        dropped = ?summary.dropped,
        "contenedor reescrito"
    );

    if !verify_archive_clean(Cursor::new(&staged[..]), family)? {
        return Err(ScrubError::Format(
            "la verificación indicó que la metadata sigue presente".to_string(),
        ));
    }

    let temp_path = staged_path(path);
    if let Err(error) = write_staged(&temp_path, &staged) {
        let _ = fs::remove_file(&temp_path);
        return Err(error.into());
    }

    replacer.commit(path, &temp_path)
}

fn write_staged(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

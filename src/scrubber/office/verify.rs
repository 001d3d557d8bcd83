use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::error::ScrubError;
use crate::scrubber::classify::ContainerFamily;

use super::archive::EntryDecision;
use super::clean::entry_decision;

/// Comprueba que un contenedor no conserva entradas de metadata de su familia.
pub fn verify_container_clean(path: &Path, family: ContainerFamily) -> Result<bool, ScrubError> {
    let file = File::open(path)?;
    verify_archive_clean(file, family)
}

/// Además de buscar entradas de metadata, descomprime cada entrada para validar su CRC.
pub(crate) fn verify_archive_clean<R: Read + Seek>(
    source: R,
    family: ContainerFamily,
) -> Result<bool, ScrubError> {
    let mut archive = ZipArchive::new(source)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry_decision(family, entry.name()) == EntryDecision::Drop {
            return Ok(false);
        }
        io::copy(&mut entry, &mut io::sink()).map_err(|e| {
            ScrubError::Format(format!("entrada `{}` ilegible: {}", entry.name(), e))
        })?;
    }

    Ok(true)
}

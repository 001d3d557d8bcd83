use std::io::{Cursor, Read, Seek, Write};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::ScrubError;

/// Resultado de evaluar el nombre de una entrada del contenedor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryDecision {
    Keep,
    Drop,
}

/// Nombres conservados y descartados, en el orden del directorio original.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub kept: Vec<String>,
    pub dropped: Vec<String>,
}

/// Reescribe un archivo ZIP conservando solo las entradas que `decide` mantiene.
///
/// Las entradas conservadas se copian en crudo: mismo nombre, método de compresión,
/// permisos, fecha y bytes comprimidos. No hay recompresión. Los directorios se
/// recrean con `add_directory` para no perder el bit de tipo del modo.
/// Cualquier error aborta la reescritura completa.
pub(crate) fn rewrite_archive<R, W, F>(
    source: R,
    target: W,
    mut decide: F,
) -> Result<(W, RewriteSummary), ScrubError>
where
    R: Read + Seek,
    W: Write + Seek,
    F: FnMut(&str) -> EntryDecision,
{
    let mut archive = ZipArchive::new(source)?;
    let mut writer = ZipWriter::new(target);
    let mut summary = RewriteSummary::default();

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();

        match decide(&name) {
            EntryDecision::Drop => summary.dropped.push(name),
            EntryDecision::Keep if entry.is_dir() => {
                let mut options =
                    FileOptions::<'_, ()>::default().compression_method(entry.compression());
                if let Some(mode) = entry.unix_mode() {
                    options = options.unix_permissions(mode);
                }
                if let Some(time) = entry.last_modified() {
                    options = options.last_modified_time(time);
                }
                writer.add_directory(name.as_str(), options)?;
                summary.kept.push(name);
            }
            EntryDecision::Keep => {
                writer.raw_copy_file(entry)?;
                summary.kept.push(name);
            }
        }
    }

    let target = writer.finish()?;
    Ok((target, summary))
}

/// Variante en memoria: devuelve los bytes del contenedor preparado.
pub fn rewrite_archive_bytes<F>(
    source: &[u8],
    decide: F,
) -> Result<(Vec<u8>, RewriteSummary), ScrubError>
where
    F: FnMut(&str) -> EntryDecision,
{
    let (staged, summary) = rewrite_archive(Cursor::new(source), Cursor::new(Vec::new()), decide)?;
    Ok((staged.into_inner(), summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::{CompressionMethod, DateTime};

    fn sample_archive() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stamp = DateTime::from_date_and_time(2021, 3, 4, 5, 6, 8)
            .map_err(|_| "fecha inválida")?;

        let stored = FileOptions::<'_, ()>::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o600)
            .last_modified_time(stamp);
        let deflated = FileOptions::<'_, ()>::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644)
            .last_modified_time(stamp);

        writer.add_directory("b/", stored.unix_permissions(0o755))?;
        writer.start_file("b/segunda.xml", deflated)?;
        writer.write_all(&b"<contenido repetido/>".repeat(64))?;
        writer.start_file("quitar.txt", stored)?;
        writer.write_all(b"fuera")?;
        writer.start_file("a/primera.bin", stored)?;
        writer.write_all(&[0_u8, 1, 2, 3, 255])?;

        Ok(writer.finish()?.into_inner())
    }

    #[test]
    fn kept_entries_are_identical_and_ordered() -> Result<(), Box<dyn std::error::Error>> {
        let source = sample_archive()?;

        let (staged, summary) = rewrite_archive_bytes(&source, |name| {
            if name == "quitar.txt" {
                EntryDecision::Drop
            } else {
                EntryDecision::Keep
            }
        })?;

        assert_eq!(summary.kept, vec!["b/", "b/segunda.xml", "a/primera.bin"]);
        assert_eq!(summary.dropped, vec!["quitar.txt"]);

        let mut original = ZipArchive::new(Cursor::new(source))?;
        let mut rewritten = ZipArchive::new(Cursor::new(staged))?;
        let names: Vec<_> = rewritten.file_names().map(str::to_string).collect();
        assert_eq!(names.len(), 3);

        for (index, expected_name) in summary.kept.iter().enumerate() {
            let mut after = rewritten.by_index(index)?;
            assert_eq!(after.name(), expected_name.as_str());
            let mut before = original.by_name(expected_name)?;

            assert_eq!(after.compression(), before.compression());
            assert_eq!(after.unix_mode(), before.unix_mode());
            assert_eq!(after.is_dir(), before.is_dir());
            assert_eq!(
                after.last_modified().map(|t| t.timepart()),
                before.last_modified().map(|t| t.timepart())
            );

            let mut before_bytes = Vec::new();
            before.read_to_end(&mut before_bytes)?;
            let mut after_bytes = Vec::new();
            after.read_to_end(&mut after_bytes)?;
            assert_eq!(before_bytes, after_bytes);
        }

        Ok(())
    }

    #[test]
    fn keep_everything_preserves_entry_set() -> Result<(), Box<dyn std::error::Error>> {
        let source = sample_archive()?;
        let (staged, summary) = rewrite_archive_bytes(&source, |_| EntryDecision::Keep)?;
        assert!(summary.dropped.is_empty());

        let rewritten = ZipArchive::new(Cursor::new(staged))?;
        assert_eq!(rewritten.len(), 4);
        Ok(())
    }

    #[test]
    fn invalid_source_is_a_format_error() {
        let error = rewrite_archive_bytes(b"esto no es un zip", |_| EntryDecision::Keep)
            .unwrap_err();
        assert_eq!(error.kind(), "format");
    }
}

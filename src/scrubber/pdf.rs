//! Limpieza opcional de PDF.
//!
//! El limpiador es una capacidad que se registra al arrancar (`--with-pdf`). Sin él,
//! los PDF fallan con un error `Unsupported` en lugar de tratarse.

use lopdf::{Document, Object, ObjectId};
use std::fs;
use std::path::Path;

use crate::error::ScrubError;

use super::constants::PDF_INFO_FIELDS;
use super::utils::secondary_staged_path;

/// Escribe en `staged` una copia de `source` sin metadata de documento.
pub trait PdfCleaner: Send + Sync {
    fn clean(&self, source: &Path, staged: &Path) -> Result<(), ScrubError>;
}

/// Implementación basada en `lopdf`: vacía el diccionario Info y quita el XMP del catálogo.
#[derive(Clone, Copy, Debug, Default)]
pub struct LopdfCleaner;

impl PdfCleaner for LopdfCleaner {
    fn clean(&self, source: &Path, staged: &Path) -> Result<(), ScrubError> {
        let intermediate = secondary_staged_path(source);
        let result = clean_in_two_stages(source, &intermediate, staged);
        let _ = fs::remove_file(&intermediate);
        result
    }
}

/// Primera etapa: quitar metadata y guardar en `.tmp2`. Segunda: recargar (lo que valida
/// la salida), podar objetos huérfanos y guardar en el destino final.
fn clean_in_two_stages(
    source: &Path,
    intermediate: &Path,
    staged: &Path,
) -> Result<(), ScrubError> {
    let mut doc = Document::load(source)?;
    let removed_info = clean_info_dict(&mut doc);
    let removed_xmp = clean_xmp_metadata(&mut doc)?;
    doc.save(intermediate)?;

    let mut doc = Document::load(intermediate)?;
    let pruned = doc.prune_objects();
    doc.save(staged)?;

    tracing::debug!(
        path = %source.display(),
        removed_info,
        removed_xmp,
        pruned = pruned.len(),
        "PDF limpiado"
    );
    Ok(())
}

/// Devuelve cuántos campos se eliminaron del diccionario Info.
fn clean_info_dict(doc: &mut Document) -> usize {
    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    let Some(info_id) = info_id else {
        // Info directo en el tráiler, sin referencia.
        return match doc.trailer.remove(b"Info") {
            Some(_) => 1,
            None => 0,
        };
    };

    let mut removed = 0;
    let mut now_empty = false;
    if let Ok(Object::Dictionary(info)) = doc.get_object_mut(info_id) {
        for field in PDF_INFO_FIELDS {
            if info.remove(field).is_some() {
                removed += 1;
            }
        }
        now_empty = info.is_empty();
    }

    if now_empty {
        doc.trailer.remove(b"Info");
        doc.objects.remove(&info_id);
    }

    removed
}

fn clean_xmp_metadata(doc: &mut Document) -> Result<bool, ScrubError> {
    let catalog_id = catalog_id(doc)?;

    let metadata_ref = match doc.get_object(catalog_id) {
        Ok(Object::Dictionary(catalog)) => match catalog.get(b"Metadata") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        },
        _ => None,
    };

    let mut removed = false;
    if let Ok(Object::Dictionary(catalog)) = doc.get_object_mut(catalog_id) {
        removed = catalog.remove(b"Metadata").is_some();
    }
    if let Some(metadata_id) = metadata_ref {
        doc.objects.remove(&metadata_id);
    }

    Ok(removed)
}

fn catalog_id(doc: &Document) -> Result<ObjectId, ScrubError> {
    match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => Ok(*id),
        _ => Err(ScrubError::Format(
            "el PDF no tiene un catálogo (Root) válido".to_string(),
        )),
    }
}

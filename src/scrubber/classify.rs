//! Clasificación de archivos por extensión: estrategia de limpieza y filtros de inclusión.

use std::path::{Path, PathBuf};

use crate::config::ExtensionFilter;
use crate::error::ScrubError;

use super::constants::{
    IMAGE_EXTENSIONS, OPENDOCUMENT_EXTENSIONS, OPENXML_EXTENSIONS, PDF_EXTENSIONS,
};
use super::utils::normalized_extension;

/// Familias de contenedores ZIP con reglas propias de eliminación.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerFamily {
    OpenXml,
    OpenDocument,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Container(ContainerFamily),
    Image,
    Pdf,
}

impl Strategy {
    pub fn from_extension(ext: &str) -> Option<Self> {
        if OPENXML_EXTENSIONS.contains(&ext) {
            Some(Strategy::Container(ContainerFamily::OpenXml))
        } else if OPENDOCUMENT_EXTENSIONS.contains(&ext) {
            Some(Strategy::Container(ContainerFamily::OpenDocument))
        } else if IMAGE_EXTENSIONS.contains(&ext) {
            Some(Strategy::Image)
        } else if PDF_EXTENSIONS.contains(&ext) {
            Some(Strategy::Pdf)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Container(ContainerFamily::OpenXml) => "openxml",
            Strategy::Container(ContainerFamily::OpenDocument) => "opendocument",
            Strategy::Image => "imagen",
            Strategy::Pdf => "pdf",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NotIncluded,
    Excluded,
    Unrecognized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Process(Strategy),
    Skip(SkipReason),
}

/// Un archivo junto con la estrategia resuelta al descubrirlo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrubJob {
    pub path: PathBuf,
    pub strategy: Strategy,
}

/// Decide qué hacer con un archivo encontrado durante el recorrido de un directorio.
pub fn classify(path: &Path, filter: &ExtensionFilter) -> Classification {
    let ext = normalized_extension(path).unwrap_or_default();

    if !filter.include.is_empty() && !filter.include.contains(&ext) {
        return Classification::Skip(SkipReason::NotIncluded);
    }
    if filter.exclude.contains(&ext) {
        return Classification::Skip(SkipReason::Excluded);
    }

    match Strategy::from_extension(&ext) {
        Some(strategy) => Classification::Process(strategy),
        None => Classification::Skip(SkipReason::Unrecognized),
    }
}

/// Variante estricta para una ruta indicada explicitamente: omitirla es un error.
pub fn classify_explicit(path: &Path, filter: &ExtensionFilter) -> Result<ScrubJob, ScrubError> {
    match classify(path, filter) {
        Classification::Process(strategy) => Ok(ScrubJob {
            path: path.to_path_buf(),
            strategy,
        }),
        Classification::Skip(SkipReason::NotIncluded) => Err(ScrubError::Config(format!(
            "{} no está en la lista de inclusión",
            path.display()
        ))),
        Classification::Skip(SkipReason::Excluded) => Err(ScrubError::Config(format!(
            "{} está en la lista de exclusión",
            path.display()
        ))),
        Classification::Skip(SkipReason::Unrecognized) => Err(ScrubError::Unsupported(format!(
            "tipo de archivo no soportado: .{}",
            normalized_extension(path).unwrap_or_default()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include: &str, exclude: &str) -> ExtensionFilter {
        ExtensionFilter::parse(include, exclude).expect("filtro válido")
    }

    #[test]
    fn maps_each_family_case_insensitively() {
        let all = ExtensionFilter::default();
        assert_eq!(
            classify(Path::new("a/Reporte.DOCX"), &all),
            Classification::Process(Strategy::Container(ContainerFamily::OpenXml))
        );
        assert_eq!(
            classify(Path::new("hoja.ods"), &all),
            Classification::Process(Strategy::Container(ContainerFamily::OpenDocument))
        );
        assert_eq!(
            classify(Path::new("foto.JPeG"), &all),
            Classification::Process(Strategy::Image)
        );
        assert_eq!(
            classify(Path::new("doc.pdf"), &all),
            Classification::Process(Strategy::Pdf)
        );
        assert_eq!(
            classify(Path::new("notas.txt"), &all),
            Classification::Skip(SkipReason::Unrecognized)
        );
        assert_eq!(
            classify(Path::new("Makefile"), &all),
            Classification::Skip(SkipReason::Unrecognized)
        );
    }

    #[test]
    fn exclude_wins_over_include() {
        let filter = filter("docx,xlsx", "xlsx");
        assert_eq!(
            classify(Path::new("b.xlsx"), &filter),
            Classification::Skip(SkipReason::Excluded)
        );
        assert_eq!(
            classify(Path::new("c.pptx"), &filter),
            Classification::Skip(SkipReason::NotIncluded)
        );
    }

    #[test]
    fn explicit_requests_are_strict() {
        let all = ExtensionFilter::default();
        let error = classify_explicit(Path::new("notas.txt"), &all).unwrap_err();
        assert_eq!(error.kind(), "unsupported");

        let error = classify_explicit(Path::new("foto.png"), &filter("", "png")).unwrap_err();
        assert_eq!(error.kind(), "config");

        let job = classify_explicit(Path::new("foto.png"), &all).expect("png soportado");
        assert_eq!(job.strategy, Strategy::Image);
    }
}

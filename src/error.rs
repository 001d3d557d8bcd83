//! Taxonomía de errores de la limpieza de metadata.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::result::ZipError;

#[derive(Error, Debug)]
pub enum ScrubError {
    /// El contenido no es un contenedor/imagen válido para el tipo declarado.
    #[error("formato no válido: {0}")]
    Format(String),

    /// Fallos de lectura, escritura o renombrado (incluye archivos bloqueados).
    #[error("error de E/S: {0}")]
    Io(#[from] io::Error),

    /// Tipo reconocido pero deshabilitado, o extensión desconocida en una solicitud explícita.
    #[error("no soportado: {0}")]
    Unsupported(String),

    #[error("configuración inválida: {0}")]
    Config(String),

    /// Cualquiera de los anteriores, etiquetado con la ruta que lo originó.
    #[error("{}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<ScrubError>,
    },
}

impl ScrubError {
    /// Etiqueta el error con la ruta del archivo; no anida etiquetas repetidas.
    pub fn at(self, path: &Path) -> Self {
        match self {
            ScrubError::File { .. } => self,
            other => ScrubError::File {
                path: path.to_path_buf(),
                source: Box::new(other),
            },
        }
    }

    /// Categoría estable del error, útil para reportes.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrubError::Format(_) => "format",
            ScrubError::Io(_) => "io",
            ScrubError::Unsupported(_) => "unsupported",
            ScrubError::Config(_) => "config",
            ScrubError::File { source, .. } => source.kind(),
        }
    }
}

impl From<ZipError> for ScrubError {
    fn from(error: ZipError) -> Self {
        match error {
            ZipError::Io(err) => ScrubError::Io(err),
            other => ScrubError::Format(format!("archivo ZIP inválido: {}", other)),
        }
    }
}

impl From<image::ImageError> for ScrubError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::IoError(err) => ScrubError::Io(err),
            other => ScrubError::Format(format!("imagen inválida: {}", other)),
        }
    }
}

impl From<lopdf::Error> for ScrubError {
    fn from(error: lopdf::Error) -> Self {
        match error {
            lopdf::Error::IO(err) => ScrubError::Io(err),
            other => ScrubError::Format(format!("PDF inválido: {}", other)),
        }
    }
}

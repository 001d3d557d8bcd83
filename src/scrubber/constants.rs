//! Extensiones reconocidas, entradas de metadata y sufijos de archivos auxiliares.

use std::time::Duration;

pub const OPENXML_EXTENSIONS: &[&str] = &["docx", "xlsx", "pptx"];
pub const OPENDOCUMENT_EXTENSIONS: &[&str] = &["odt", "ods", "odp"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];
pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

/// Carpeta reservada de propiedades en paquetes OpenXML (comparación sin mayúsculas).
pub const OPENXML_PROPERTIES_PREFIX: &str = "docprops/";
/// Archivo de metadata en la raíz de paquetes OpenDocument.
pub const OPENDOCUMENT_META_ENTRY: &str = "meta.xml";

pub const BACKUP_SUFFIX: &str = "bak";
pub const STAGED_SUFFIX: &str = "tmp";
pub const SECONDARY_STAGED_SUFFIX: &str = "tmp2";

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);
pub const MIN_WORKERS: usize = 2;

pub const JPEG_QUALITY: u8 = 95;

/// Campos del diccionario Info de un PDF que identifican autoría u origen.
pub const PDF_INFO_FIELDS: [&[u8]; 8] = [
    b"Title",
    b"Author",
    b"Subject",
    b"Keywords",
    b"Creator",
    b"Producer",
    b"CreationDate",
    b"ModDate",
];

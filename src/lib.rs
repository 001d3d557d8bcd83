//! metascrub: elimina metadata identificable de documentos e imágenes reescribiendo
//! sus contenedores y reemplazando los originales de forma segura.

pub mod config;
pub mod error;
pub mod scrubber;

pub use config::{ExtensionFilter, ScrubConfig};
pub use error::ScrubError;

//! Limpieza de imágenes: decodificar y volver a codificar sin metadata.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::ScrubError;

use super::constants::JPEG_QUALITY;
use super::replace::{CommitReport, Replacer};
use super::utils::staged_path;

/// Elimina EXIF/XMP y demás bloques de una imagen manteniendo los píxeles.
pub fn remove_image_metadata(path: &Path, replacer: &Replacer) -> Result<CommitReport, ScrubError> {
    stage_and_commit(path, replacer).map_err(|e| e.at(path))
}

fn stage_and_commit(path: &Path, replacer: &Replacer) -> Result<CommitReport, ScrubError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| ScrubError::Format("no se reconoce el formato de la imagen".to_string()))?;
    let img = reader.decode()?;

    let temp_path = staged_path(path);

    if let Err(error) = encode_without_metadata(&img, format, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(error);
    }

    let metadata_clean = match format {
        ImageFormat::Jpeg | ImageFormat::Png => verify_image_metadata_clean(&temp_path),
        _ => Ok(true),
    };

    match metadata_clean {
        Ok(true) => {}
        Ok(false) => {
            let _ = fs::remove_file(&temp_path);
            return Err(ScrubError::Format(
                "la verificación indicó que la metadata no se eliminó correctamente".to_string(),
            ));
        }
        Err(error) => {
            let _ = fs::remove_file(&temp_path);
            return Err(error);
        }
    }

    replacer.commit(path, &temp_path)
}

fn encode_without_metadata(
    img: &DynamicImage,
    format: ImageFormat,
    target: &Path,
) -> Result<(), ScrubError> {
    let file = File::create(target)?;

    match format {
        ImageFormat::Jpeg => {
            let mut writer = BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
            jpeg_compatible(img).write_with_encoder(encoder)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        ImageFormat::Png => {
            let mut writer = BufWriter::new(file);
            let encoder = PngEncoder::new_with_quality(
                &mut writer,
                CompressionType::Best,
                FilterType::Adaptive,
            );
            img.write_with_encoder(encoder)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        ImageFormat::Tiff => {
            let mut file = file;
            img.write_with_encoder(TiffEncoder::new(&mut file))?;
            file.sync_all()?;
        }
        other => {
            return Err(ScrubError::Unsupported(format!(
                "formato de imagen no soportado: {:?}",
                other
            )));
        }
    }

    Ok(())
}

/// El codificador JPEG no admite canal alfa ni 16 bits.
fn jpeg_compatible(img: &DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img.clone(),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Comprueba que una imagen carece de campos EXIF residuales.
pub fn verify_image_metadata_clean(path: &Path) -> Result<bool, ScrubError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Ok(exif.fields().next().is_none()),
        Err(exif::Error::NotFound(_)) | Err(exif::Error::BlankValue(_)) => Ok(true),
        Err(exif::Error::InvalidFormat(_)) => Ok(true),
        Err(exif::Error::Io(err)) => Err(ScrubError::Io(err)),
        Err(other) => Err(ScrubError::Format(format!(
            "error verificando metadata EXIF: {}",
            other
        ))),
    }
}

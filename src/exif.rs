/**
 * Photo capture date reading with kamadak-exif
 *
 * Only DateTimeOriginal (0x9003, decimal 36867) counts as an embedded capture
 * date. DateTime and DateTimeDigitized are edit/scan times and are ignored.
 *
 * The TIFF block is located through `container`, the same code the writer
 * uses, so a WebP EXIF chunk is found with or without its `Exif\0\0` prefix.
 */

use exif::{Exif, In, Reader as ExifReader, Tag, Value};
use log::debug;
use std::fs;
use std::path::Path;

use crate::container;
use crate::error::ReadError;
use crate::media::CaptureTimestamp;
use crate::reconcile::CaptureMetadataReader;

#[derive(Debug, Default, Clone, Copy)]
pub struct PhotoExifReader;

impl PhotoExifReader {
    pub fn new() -> Self {
        Self
    }

    /// Read DateTimeOriginal from a JPEG, PNG or WebP container.
    ///
    /// A container with no EXIF block, or a block without the tag, is
    /// `Ok(None)`. Open failures, unknown containers and corrupt blocks are errors.
    pub fn read_date_time_original(&self, file_path: &Path) -> Result<Option<CaptureTimestamp>, ReadError> {
        let bytes = fs::read(file_path).map_err(|source| ReadError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;

        let image = container::parse(&bytes)
            .map_err(|e| ReadError::Container(e.to_string()))?
            .ok_or_else(|| ReadError::Container("not a JPEG, PNG or WebP file".to_string()))?;

        let Some(tiff) = container::exif_tiff(&image) else {
            debug!("No EXIF block in {}", file_path.display());
            return Ok(None);
        };

        let exif = ExifReader::new().read_raw(tiff)?;
        Ok(date_time_original(&exif))
    }
}

impl CaptureMetadataReader for PhotoExifReader {
    fn read_capture_date(&self, path: &Path) -> Result<Option<CaptureTimestamp>, ReadError> {
        self.read_date_time_original(path)
    }
}

/// DateTimeOriginal from a parsed tag table, `None` if missing or malformed
pub fn date_time_original(exif: &Exif) -> Option<CaptureTimestamp> {
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    match field.value {
        Value::Ascii(ref vec) => {
            let raw = vec.first()?;
            let value = String::from_utf8_lossy(raw);
            let parsed = CaptureTimestamp::parse_exif(&value);
            if parsed.is_none() {
                debug!("Ignoring malformed DateTimeOriginal '{}'", value);
            }
            parsed
        }
        _ => None,
    }
}

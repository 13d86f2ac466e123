/**
 * EXIF Writer module - metadata-only DateTimeOriginal updates
 *
 * - Existing tag table is parsed with kamadak-exif and re-serialized with its
 *   experimental writer in the original byte order
 * - The TIFF block is spliced into JPEG (APP1), PNG (eXIf) or WebP (EXIF)
 *   containers through `container`; entropy-coded image data is never decoded
 * - The payload digest is compared before the file is replaced
 */

use exif::experimental::Writer;
use exif::{Exif, Field, In, Reader as ExifReader, Tag, Value};
use log::debug;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::container::{self, EXIF_HEADER};
use crate::error::WriteError;
use crate::fs_atomic::atomic_write_replace;
use crate::hashing::payload_digest;
use crate::media::CaptureTimestamp;
use crate::reconcile::CaptureMetadataWriter;

#[derive(Debug, Default, Clone, Copy)]
pub struct PhotoExifWriter;

impl PhotoExifWriter {
    pub fn new() -> Self {
        Self
    }

    /// Set DateTimeOriginal on a photo, keeping all other tags and the encoded image intact
    pub fn write_date_time_original(&self, file_path: &Path, timestamp: CaptureTimestamp) -> Result<(), WriteError> {
        debug!("Writing DateTimeOriginal {} to {}", timestamp.to_exif_string(), file_path.display());

        let original = fs::read(file_path).map_err(|source| WriteError::Io {
            path: file_path.to_path_buf(),
            source,
        })?;

        let updated = splice_date_time_original(&original, timestamp)?;

        let before = payload_digest(&original)
            .ok_or_else(|| WriteError::Container("cannot locate encoded payload".to_string()))?;
        let after = payload_digest(&updated)
            .ok_or_else(|| WriteError::Container("re-encoded container is unreadable".to_string()))?;
        if before != after {
            return Err(WriteError::PayloadChanged(file_path.to_path_buf()));
        }

        atomic_write_replace(file_path, &updated).map_err(|source| WriteError::Io {
            path: file_path.to_path_buf(),
            source,
        })
    }
}

impl CaptureMetadataWriter for PhotoExifWriter {
    fn write_capture_date(&self, path: &Path, timestamp: CaptureTimestamp) -> Result<(), WriteError> {
        self.write_date_time_original(path, timestamp)
    }
}

/// Return the container bytes with DateTimeOriginal set to `timestamp`
pub fn splice_date_time_original(bytes: &[u8], timestamp: CaptureTimestamp) -> Result<Vec<u8>, WriteError> {
    let mut image = container::parse(bytes)
        .map_err(|e| WriteError::Container(e.to_string()))?
        .ok_or_else(|| WriteError::Container("not a JPEG, PNG or WebP file".to_string()))?;

    let existing = container::exif_tiff(&image);
    let block = build_exif_block(existing.as_deref(), timestamp)?;

    container::set_exif_tiff(&mut image, block)?;
    Ok(container::encode(image))
}

/// Serialize a TIFF tag table carrying every existing field plus the new DateTimeOriginal.
///
/// Fields outside IFD0/IFD1 and fields of unknown type cannot be written back
/// and are dropped; IFD pointers and thumbnail offsets are synthesized by the
/// writer.
pub fn build_exif_block(existing: Option<&[u8]>, timestamp: CaptureTimestamp) -> Result<Vec<u8>, WriteError> {
    let parsed: Option<Exif> = match existing {
        Some(raw) => {
            let raw = raw.strip_prefix(EXIF_HEADER).unwrap_or(raw);
            Some(ExifReader::new().read_raw(raw.to_vec())?)
        }
        None => None,
    };

    // Big-endian is what most tools emit for a fresh block
    let little_endian = parsed.as_ref().map_or(false, |exif| exif.little_endian());

    let date_field = Field {
        tag: Tag::DateTimeOriginal,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![timestamp.to_exif_string().into_bytes()]),
    };

    let mut fields: Vec<&Field> = Vec::new();
    let mut thumbnail: Option<&[u8]> = None;

    if let Some(exif) = parsed.as_ref() {
        for field in exif.fields() {
            if field.tag == Tag::DateTimeOriginal && field.ifd_num == In::PRIMARY {
                continue;
            }
            if field.ifd_num != In::PRIMARY && field.ifd_num != In::THUMBNAIL {
                debug!("Dropping {} from {:?}", field.tag, field.ifd_num);
                continue;
            }
            if let Value::Unknown(..) = field.value {
                debug!("Dropping {} with unknown value type", field.tag);
                continue;
            }
            fields.push(field);
        }
        thumbnail = thumbnail_jpeg(exif);
    }
    fields.push(&date_field);

    let mut writer = Writer::new();
    for &field in &fields {
        writer.push_field(field);
    }
    if let Some(jpeg) = thumbnail {
        writer.set_jpeg(jpeg, In::THUMBNAIL);
    }

    let mut buf = Cursor::new(Vec::new());
    writer.write(&mut buf, little_endian)?;
    Ok(buf.into_inner())
}

/// Embedded JPEG thumbnail referenced from IFD1, if any
fn thumbnail_jpeg(exif: &Exif) -> Option<&[u8]> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let length = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    exif.buf().get(offset..offset.checked_add(length)?)
}

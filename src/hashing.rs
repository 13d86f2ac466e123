/**
 * Encoded payload digests using xxhash
 *
 * The digest covers every byte of the container except the blocks that carry
 * EXIF metadata, so a metadata-only rewrite must leave it unchanged.
 */

use log::debug;
use xxhash_rust::xxh3::Xxh3;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_APP1: u8 = 0xE1;
const JPEG_SOS: u8 = 0xDA;
const JPEG_EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8] = b"Exif\0\0";
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Digest of the encoded payload of a JPEG, PNG or WebP file.
///
/// Returns `None` for unrecognized or truncated containers.
pub fn payload_digest(bytes: &[u8]) -> Option<String> {
    let mut hasher = Xxh3::default();

    if bytes.starts_with(&JPEG_SOI) {
        hash_jpeg(bytes, &mut hasher)?;
    } else if bytes.starts_with(&PNG_SIGNATURE) {
        hash_png(bytes, &mut hasher)?;
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        hash_webp(bytes, &mut hasher)?;
    } else {
        debug!("Unrecognized container signature");
        return None;
    }

    Some(format!("{:016x}", hasher.digest()))
}

/// Hash every segment except EXIF APP1, then the scan data through end of file
fn hash_jpeg(bytes: &[u8], hasher: &mut Xxh3) -> Option<()> {
    hasher.update(&JPEG_SOI);
    let mut pos = 2usize;

    loop {
        // Fill bytes between segments are not part of the payload
        while bytes.get(pos) == Some(&0xFF) && bytes.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&0xFF) {
            return None;
        }
        let marker = *bytes.get(pos + 1)?;

        if marker == JPEG_EOI {
            hasher.update(&bytes[pos..]);
            return Some(());
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            hasher.update(&bytes[pos..pos + 2]);
            pos += 2;
            continue;
        }

        let length = u16::from_be_bytes([*bytes.get(pos + 2)?, *bytes.get(pos + 3)?]) as usize;
        if length < 2 {
            return None;
        }
        let end = pos.checked_add(2 + length)?;
        let segment = bytes.get(pos..end)?;

        if marker == JPEG_SOS {
            hasher.update(&bytes[pos..]);
            return Some(());
        }

        let is_exif = marker == JPEG_APP1 && segment[4..].starts_with(EXIF_HEADER);
        if !is_exif {
            hasher.update(segment);
        }
        pos = end;
    }
}

/// Hash every chunk except eXIf
fn hash_png(bytes: &[u8], hasher: &mut Xxh3) -> Option<()> {
    hasher.update(&PNG_SIGNATURE);
    let mut pos = PNG_SIGNATURE.len();

    while pos < bytes.len() {
        let length = u32::from_be_bytes(bytes.get(pos..pos + 4)?.try_into().ok()?) as usize;
        let chunk_type = bytes.get(pos + 4..pos + 8)?;
        let end = pos.checked_add(12)?.checked_add(length)?;
        let chunk = bytes.get(pos..end)?;

        if chunk_type != b"eXIf" {
            hasher.update(chunk);
        }
        pos = end;

        if chunk_type == b"IEND" {
            hasher.update(&bytes[pos..]);
            break;
        }
    }

    Some(())
}

/// Hash every RIFF chunk except EXIF and VP8X, whose feature flags track the EXIF chunk
fn hash_webp(bytes: &[u8], hasher: &mut Xxh3) -> Option<()> {
    hasher.update(b"WEBP");
    let mut pos = 12usize;

    while pos + 8 <= bytes.len() {
        let fourcc = &bytes[pos..pos + 4];
        let size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().ok()?) as usize;
        let padded = size + (size & 1);
        let end = (pos + 8).checked_add(padded)?.min(bytes.len());

        if fourcc != b"EXIF" && fourcc != b"VP8X" {
            hasher.update(bytes.get(pos..end)?);
        }
        pos = end;
    }

    Some(())
}

/**
 * EXIF block access for JPEG, PNG and WebP containers
 *
 * The reader and the writer both go through this module so they agree on where
 * the TIFF block lives and whether it carries the `Exif\0\0` prefix.
 */

use img_parts::jpeg::{markers, Jpeg, JpegSegment};
use img_parts::riff::{RiffChunk, RiffContent};
use img_parts::webp::{WebP, CHUNK_ALPH, CHUNK_EXIF, CHUNK_VP8, CHUNK_VP8L, CHUNK_VP8X};
use img_parts::{Bytes, DynImage, ImageEXIF};

use crate::error::WriteError;

pub const EXIF_HEADER: &[u8] = b"Exif\0\0";

const VP8X_ALPHA: u8 = 0b0001_0000;
const VP8X_EXIF: u8 = 0b0000_1000;

/// Parse a photo container, `Ok(None)` for anything that is not JPEG, PNG or WebP
pub fn parse(bytes: &[u8]) -> Result<Option<DynImage>, img_parts::Error> {
    DynImage::from_bytes(Bytes::copy_from_slice(bytes))
}

/// The TIFF block of the container's EXIF metadata, without any `Exif\0\0` prefix
pub fn exif_tiff(image: &DynImage) -> Option<Vec<u8>> {
    let raw: Vec<u8> = match image {
        // WebP files in the wild store the chunk with and without the prefix
        DynImage::WebP(webp) => webp
            .chunk_by_id(CHUNK_EXIF)
            .and_then(|chunk| chunk.content().data())
            .map(|data| data.to_vec())?,
        other => other.exif()?.to_vec(),
    };
    let tiff = raw.strip_prefix(EXIF_HEADER).unwrap_or(&raw);
    if tiff.is_empty() {
        return None;
    }
    Some(tiff.to_vec())
}

/// Replace the container's EXIF block with `tiff`
pub fn set_exif_tiff(image: &mut DynImage, tiff: Vec<u8>) -> Result<(), WriteError> {
    match image {
        DynImage::Jpeg(jpeg) => splice_jpeg_app1(jpeg, tiff),
        DynImage::WebP(webp) => splice_webp_exif(webp, tiff),
        DynImage::Png(png) => {
            png.set_exif(Some(Bytes::from(tiff)));
            Ok(())
        }
    }
}

/// Insert the EXIF APP1 segment right after SOI and any APP0, where readers expect it
fn splice_jpeg_app1(jpeg: &mut Jpeg, tiff: Vec<u8>) -> Result<(), WriteError> {
    let mut contents = EXIF_HEADER.to_vec();
    contents.extend_from_slice(&tiff);
    // Segment length field counts itself
    if contents.len() + 2 > u16::MAX as usize {
        return Err(WriteError::Container(format!(
            "EXIF block of {} bytes does not fit in an APP1 segment",
            contents.len()
        )));
    }

    let segments = jpeg.segments_mut();
    segments.retain(|segment| {
        !(segment.marker() == markers::APP1 && segment.contents().starts_with(EXIF_HEADER))
    });
    if segments.is_empty() {
        return Err(WriteError::Container("JPEG has no segments".to_string()));
    }

    let at = segments
        .iter()
        .take_while(|segment| segment.marker() == markers::APP0)
        .count();
    segments.insert(at, JpegSegment::new_with_contents(markers::APP1, Bytes::from(contents)));
    Ok(())
}

/// Store `tiff` as an unprefixed EXIF chunk and flag it in the VP8X header,
/// converting a simple-format file to the extended format when needed
fn splice_webp_exif(webp: &mut WebP, tiff: Vec<u8>) -> Result<(), WriteError> {
    let vp8x = match webp.chunk_by_id(CHUNK_VP8X) {
        Some(chunk) => {
            let mut data = chunk
                .content()
                .data()
                .filter(|data| data.len() >= 10)
                .ok_or_else(|| WriteError::Container("truncated VP8X chunk".to_string()))?
                .to_vec();
            data[0] |= VP8X_EXIF;
            data
        }
        None => simple_to_vp8x(webp)?,
    };

    let chunks = webp.chunks_mut();
    chunks.retain(|chunk| chunk.id() != CHUNK_EXIF && chunk.id() != CHUNK_VP8X);
    chunks.insert(0, RiffChunk::new(CHUNK_VP8X, RiffContent::Data(Bytes::from(vp8x))));
    chunks.push(RiffChunk::new(CHUNK_EXIF, RiffContent::Data(Bytes::from(tiff))));
    Ok(())
}

/// VP8X header for a simple-format file, with canvas size taken from the bitstream
fn simple_to_vp8x(webp: &WebP) -> Result<Vec<u8>, WriteError> {
    let bitstream = move |id| webp.chunk_by_id(id).and_then(|chunk| chunk.content().data());

    let (width, height, alpha) = if let Some(data) = bitstream(CHUNK_VP8L) {
        // 0x2f signature, then 14-bit width-1, 14-bit height-1, alpha bit
        let header = data
            .get(1..5)
            .filter(|_| data[0] == 0x2f)
            .ok_or_else(|| WriteError::Container("invalid VP8L header".to_string()))?;
        let bits = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        ((bits & 0x3FFF) + 1, ((bits >> 14) & 0x3FFF) + 1, bits & (1 << 28) != 0)
    } else if let Some(data) = bitstream(CHUNK_VP8) {
        // 3-byte frame tag (keyframe bit clear), start code, 14-bit dimensions
        match data.get(0..10) {
            Some(h) if h[0] & 1 == 0 && h[3..6] == [0x9d, 0x01, 0x2a] => {
                let width = u16::from_le_bytes([h[6], h[7]]) & 0x3FFF;
                let height = u16::from_le_bytes([h[8], h[9]]) & 0x3FFF;
                (u32::from(width), u32::from(height), webp.chunk_by_id(CHUNK_ALPH).is_some())
            }
            _ => return Err(WriteError::Container("invalid VP8 header".to_string())),
        }
    } else {
        return Err(WriteError::Container("WebP has no image bitstream".to_string()));
    };

    if width == 0 || height == 0 {
        return Err(WriteError::Container("WebP canvas has zero size".to_string()));
    }

    let mut vp8x = vec![0u8; 10];
    vp8x[0] = VP8X_EXIF | if alpha { VP8X_ALPHA } else { 0 };
    vp8x[4..7].copy_from_slice(&(width - 1).to_le_bytes()[..3]);
    vp8x[7..10].copy_from_slice(&(height - 1).to_le_bytes()[..3]);
    Ok(vp8x)
}

pub fn encode(image: DynImage) -> Vec<u8> {
    image.encoder().bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::payload_digest;
    use crate::test_support::{short_jpeg, webp, webp_chunk_ids};

    #[test]
    fn test_webp_chunk_with_and_without_prefix() {
        let tiff = b"MM\0*\0\0\0\x08\0\0\0\0\0\0".to_vec();

        let plain = parse(&webp(Some(tiff.as_slice()))).unwrap().unwrap();
        assert_eq!(exif_tiff(&plain), Some(tiff.clone()));

        let mut prefixed_chunk = EXIF_HEADER.to_vec();
        prefixed_chunk.extend_from_slice(&tiff);
        let prefixed = parse(&webp(Some(prefixed_chunk.as_slice()))).unwrap().unwrap();
        assert_eq!(exif_tiff(&prefixed), Some(tiff));

        let bare = parse(&webp(None)).unwrap().unwrap();
        assert_eq!(exif_tiff(&bare), None);
    }

    #[test]
    fn test_webp_set_replaces_single_chunk() {
        let old = b"MM\0*\0\0\0\x08\0\0\0\0\0\0".to_vec();
        let mut image = parse(&webp(Some(old.as_slice()))).unwrap().unwrap();
        let tiff = b"II*\0\x08\0\0\0\0\0\0\0\0\0".to_vec();
        set_exif_tiff(&mut image, tiff.clone()).unwrap();

        let bytes = encode(image);
        let exif_chunks = webp_chunk_ids(&bytes).iter().filter(|id| id == &b"EXIF").count();
        assert_eq!(exif_chunks, 1);
        assert_eq!(exif_tiff(&parse(&bytes).unwrap().unwrap()), Some(tiff));
    }

    #[test]
    fn test_simple_webp_gains_vp8x_header() {
        let original = webp(None);
        let mut image = parse(&original).unwrap().unwrap();
        set_exif_tiff(&mut image, b"II*\0\x08\0\0\0\0\0\0\0\0\0".to_vec()).unwrap();
        let bytes = encode(image);

        assert_eq!(webp_chunk_ids(&bytes), vec![*b"VP8X", *b"VP8L", *b"EXIF"]);
        // VP8X payload starts after the 12-byte RIFF header and 8-byte chunk header
        assert_eq!(bytes[20] & VP8X_EXIF, VP8X_EXIF);
        assert_eq!(&bytes[24..30], &[0, 0, 0, 0, 0, 0]);
        let riff_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        assert_eq!(riff_size + 8, bytes.len());
        assert_eq!(payload_digest(&original), payload_digest(&bytes));
    }

    #[test]
    fn test_webp_without_bitstream_is_rejected() {
        // RIFF/WEBP holding only an unknown chunk
        let bytes = b"RIFF\x0e\0\0\0WEBPJUNK\x02\0\0\0ab".to_vec();
        let mut image = parse(&bytes).unwrap().unwrap();
        let result = set_exif_tiff(&mut image, b"II*\0\x08\0\0\0\0\0\0\0\0\0".to_vec());
        assert!(matches!(result, Err(WriteError::Container(_))));
    }

    #[test]
    fn test_short_jpeg_gets_app1() {
        let original = short_jpeg();
        let mut image = parse(&original).unwrap().unwrap();
        assert_eq!(exif_tiff(&image), None);

        let tiff = b"MM\0*\0\0\0\x08\0\0\0\0\0\0".to_vec();
        set_exif_tiff(&mut image, tiff.clone()).unwrap();
        let bytes = encode(image);

        assert_eq!(&bytes[2..4], &[0xFF, markers::APP1]);
        assert_eq!(payload_digest(&original), payload_digest(&bytes));
        assert_eq!(exif_tiff(&parse(&bytes).unwrap().unwrap()), Some(tiff));
    }

    #[test]
    fn test_oversized_jpeg_block_is_rejected() {
        let mut image = parse(&short_jpeg()).unwrap().unwrap();
        let result = set_exif_tiff(&mut image, vec![0u8; 70_000]);
        assert!(matches!(result, Err(WriteError::Container(_))));
    }
}

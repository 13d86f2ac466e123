/**
 * Image fixtures for tests
 *
 * JPEG and PNG come from the `image` encoder. WebP and the minimal JPEG are
 * assembled by hand so their exact chunk and segment layout is known.
 */

use exif::experimental::Writer;
use exif::Field;
use image::{Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Lossless 1x1 bitstream, signature byte 0x2f first
const VP8L_1X1: &[u8] = &[
    0x2f, 0x00, 0x00, 0x00, 0x10, 0x07, 0x10, 0x11, 0x11, 0x88, 0x88, 0xfe, 0x07,
];

fn gradient() -> RgbImage {
    RgbImage::from_fn(16, 12, |x, y| Rgb([(x * 15) as u8, (y * 20) as u8, 128]))
}

/// Encode a small baseline JPEG without any EXIF block
pub fn write_jpeg(path: &Path) {
    gradient()
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

pub fn write_png(path: &Path) {
    gradient()
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

pub fn write_webp(path: &Path, exif: Option<&[u8]>) {
    std::fs::write(path, webp(exif)).unwrap();
}

/// SOI, one quantization table, SOS, entropy bytes, EOI. No APP0 or APP1.
pub fn short_jpeg() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
    bytes.extend_from_slice(&[0x01; 64]);
    bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    bytes.extend_from_slice(&[0x12, 0x34, 0x56, 0x78, 0x9A]);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

fn riff_chunk(out: &mut Vec<u8>, id: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
}

/// 1x1 lossless WebP. With `exif`, the file uses the extended layout and the
/// EXIF chunk holds `exif` verbatim, prefix or not.
pub fn webp(exif: Option<&[u8]>) -> Vec<u8> {
    let mut body = b"WEBP".to_vec();
    if let Some(exif) = exif {
        // EXIF flag, reserved, canvas 1x1 stored as width-1 and height-1
        riff_chunk(&mut body, b"VP8X", &[0x08, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        riff_chunk(&mut body, b"VP8L", VP8L_1X1);
        riff_chunk(&mut body, b"EXIF", exif);
    } else {
        riff_chunk(&mut body, b"VP8L", VP8L_1X1);
    }

    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&body);
    bytes
}

/// Top-level chunk ids of a WebP file, in order
pub fn webp_chunk_ids(bytes: &[u8]) -> Vec<[u8; 4]> {
    let mut ids = Vec::new();
    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = [bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]];
        let len = u32::from_le_bytes([bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]]) as usize;
        ids.push(id);
        pos += 8 + len + len % 2;
    }
    ids
}

/// Serialize `fields` into the primary IFD of a TIFF block
pub fn tiff_with(fields: &[Field], little_endian: bool) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut out = Cursor::new(Vec::new());
    writer.write(&mut out, little_endian).unwrap();
    out.into_inner()
}

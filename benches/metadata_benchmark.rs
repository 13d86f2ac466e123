use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{Rgb, RgbImage};
use rayon::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

use datefill_rs::exif::PhotoExifReader;
use datefill_rs::exif_writer::PhotoExifWriter;
use datefill_rs::hashing::payload_digest;
use datefill_rs::naming::{ExtractorConfig, FilenameTimestampExtractor};

/// Generate `count` JPEGs, half of them carrying DateTimeOriginal
fn generate_photos(dir: &TempDir, count: usize) -> Vec<PathBuf> {
    let pixels = RgbImage::from_fn(640, 480, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]));
    let writer = PhotoExifWriter::new();
    let extractor = FilenameTimestampExtractor::new(ExtractorConfig::default()).unwrap();

    (0..count)
        .map(|i| {
            let name = format!("IMG_{}.jpg", 1_600_000_000_000u64 + i as u64 * 1000);
            let path = dir.path().join(&name);
            pixels.save(&path).unwrap();
            if i % 2 == 0 {
                let timestamp = extractor.extract(&name).unwrap();
                writer.write_date_time_original(&path, timestamp).unwrap();
            }
            path
        })
        .collect()
}

fn benchmark_filename_extraction(c: &mut Criterion) {
    let extractor = FilenameTimestampExtractor::new(ExtractorConfig::default()).unwrap();
    let names: Vec<String> = (0..1000)
        .map(|i| match i % 4 {
            0 => format!("mmexport{}.jpg", 1_600_000_000_000u64 + i),
            1 => format!("wx_camera_{}.mp4", 1_650_000_000_000u64 + i),
            2 => format!("IMG_20190509_{:06}.jpg", i),
            _ => format!("holiday-{}.png", i),
        })
        .collect();

    let mut group = c.benchmark_group("Filename Extraction");
    group.throughput(criterion::Throughput::Elements(names.len() as u64));
    group.bench_function("extract-1000", |b| {
        b.iter(|| {
            names
                .iter()
                .filter_map(|name| extractor.extract(black_box(name)))
                .count()
        })
    });
    group.finish();
}

fn benchmark_photo_reads(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let photos = generate_photos(&dir, 40);
    let reader = PhotoExifReader::new();

    let mut group = c.benchmark_group("Photo Metadata Reads");
    group.sample_size(20);

    for file_count in [1usize, 10, 40] {
        let files = &photos[..file_count];

        group.bench_with_input(BenchmarkId::new("sequential", file_count), &file_count, |b, _| {
            b.iter(|| {
                files
                    .iter()
                    .map(|path| reader.read_date_time_original(black_box(path)))
                    .filter(|r| matches!(r, Ok(Some(_))))
                    .count()
            })
        });

        group.bench_with_input(BenchmarkId::new("parallel", file_count), &file_count, |b, _| {
            b.iter(|| {
                files
                    .par_iter()
                    .map(|path| reader.read_date_time_original(black_box(path)))
                    .filter(|r| matches!(r, Ok(Some(_))))
                    .count()
            })
        });
    }

    group.finish();
}

fn benchmark_payload_digest(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let photos = generate_photos(&dir, 1);
    let bytes = std::fs::read(&photos[0]).unwrap();

    let mut group = c.benchmark_group("Payload Digest");
    group.throughput(criterion::Throughput::Bytes(bytes.len() as u64));
    group.bench_function("jpeg-640x480", |b| b.iter(|| payload_digest(black_box(&bytes))));
    group.finish();
}

criterion_group!(
    benches,
    benchmark_filename_extraction,
    benchmark_photo_reads,
    benchmark_payload_digest
);
criterion_main!(benches);

/**
 * Per-file reconciliation of embedded and filename capture timestamps
 */

use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::error::{ReadError, WriteError};
use crate::exif::PhotoExifReader;
use crate::exif_writer::PhotoExifWriter;
use crate::media::{CaptureTimestamp, MediaFile, MediaKind};
use crate::naming::FilenameTimestampExtractor;
use crate::video::{ExifToolClient, VideoMetadata};

pub trait CaptureMetadataReader: Send + Sync {
    /// Embedded capture timestamp, `Ok(None)` when the container has none
    fn read_capture_date(&self, path: &Path) -> Result<Option<CaptureTimestamp>, ReadError>;
}

pub trait CaptureMetadataWriter: Send + Sync {
    /// Persist `timestamp` without altering the encoded media payload
    fn write_capture_date(&self, path: &Path, timestamp: CaptureTimestamp) -> Result<(), WriteError>;
}

/// Reader and writer pair for one media kind
pub struct MetadataBackend {
    pub reader: Box<dyn CaptureMetadataReader>,
    pub writer: Box<dyn CaptureMetadataWriter>,
}

impl MetadataBackend {
    pub fn new(
        reader: impl CaptureMetadataReader + 'static,
        writer: impl CaptureMetadataWriter + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

pub struct Backends {
    pub photo: MetadataBackend,
    pub video: MetadataBackend,
}

impl Backends {
    /// kamadak-exif/img-parts for photos, the given exiftool binary for videos
    pub fn native(exiftool: impl Into<PathBuf>) -> Self {
        let exiftool = exiftool.into();
        Self {
            photo: MetadataBackend::new(PhotoExifReader::new(), PhotoExifWriter::new()),
            video: MetadataBackend::new(
                VideoMetadata::new(ExifToolClient::new(exiftool.clone())),
                VideoMetadata::new(ExifToolClient::new(exiftool)),
            ),
        }
    }

    pub fn for_kind(&self, kind: MediaKind) -> &MetadataBackend {
        match kind {
            MediaKind::Photo => &self.photo,
            MediaKind::Video => &self.video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Classify only
    #[default]
    DryRun,
    /// Write recovered timestamps back into the files
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationResult {
    HasEmbeddedTimestamp {
        file: MediaFile,
        timestamp: CaptureTimestamp,
    },
    RecoveredFromFilename {
        file: MediaFile,
        timestamp: CaptureTimestamp,
        write: WriteOutcome,
    },
    Unrecoverable {
        file: MediaFile,
    },
}

impl ReconciliationResult {
    pub fn file(&self) -> &MediaFile {
        match self {
            ReconciliationResult::HasEmbeddedTimestamp { file, .. }
            | ReconciliationResult::RecoveredFromFilename { file, .. }
            | ReconciliationResult::Unrecoverable { file } => file,
        }
    }

    /// True for both embedded and recovered timestamps, whatever the write outcome
    pub fn has_timestamp(&self) -> bool {
        !matches!(self, ReconciliationResult::Unrecoverable { .. })
    }

    pub fn timestamp(&self) -> Option<CaptureTimestamp> {
        match self {
            ReconciliationResult::HasEmbeddedTimestamp { timestamp, .. }
            | ReconciliationResult::RecoveredFromFilename { timestamp, .. } => Some(*timestamp),
            ReconciliationResult::Unrecoverable { .. } => None,
        }
    }
}

pub struct FileReconciler {
    extractor: FilenameTimestampExtractor,
    backends: Backends,
    mode: ReconcileMode,
}

impl FileReconciler {
    pub fn new(extractor: FilenameTimestampExtractor, backends: Backends, mode: ReconcileMode) -> Self {
        Self {
            extractor,
            backends,
            mode,
        }
    }

    pub fn mode(&self) -> ReconcileMode {
        self.mode
    }

    /// Classify one file, writing the filename timestamp back when nothing is embedded
    pub fn reconcile(&self, file: &MediaFile) -> ReconciliationResult {
        let backend = self.backends.for_kind(file.kind);

        let embedded = match backend.reader.read_capture_date(&file.path) {
            Ok(found) => found,
            Err(e) => {
                warn!("Could not read {} metadata from {}: {}", file.kind, file.path.display(), e);
                None
            }
        };

        if let Some(timestamp) = embedded {
            debug!("{} already has capture date {}", file.filename, timestamp);
            return ReconciliationResult::HasEmbeddedTimestamp {
                file: file.clone(),
                timestamp,
            };
        }

        let Some(timestamp) = self.extractor.extract(&file.filename) else {
            debug!("No usable timestamp in filename {}", file.filename);
            return ReconciliationResult::Unrecoverable { file: file.clone() };
        };

        let write = match self.mode {
            ReconcileMode::DryRun => WriteOutcome::Skipped,
            ReconcileMode::Apply => match backend.writer.write_capture_date(&file.path, timestamp) {
                Ok(()) => {
                    info!("Set capture date of {} to {}", file.filename, timestamp);
                    WriteOutcome::Written
                }
                Err(e) => {
                    warn!("Failed to write capture date to {}: {}", file.path.display(), e);
                    WriteOutcome::Failed(e.to_string())
                }
            },
        };

        ReconciliationResult::RecoveredFromFilename {
            file: file.clone(),
            timestamp,
            write,
        }
    }
}

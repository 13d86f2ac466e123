/**
 * Media file model and capture timestamp type shared by every stage of a run
 */

use chrono::{NaiveDateTime, Timelike};
use std::fmt;
use std::path::{Path, PathBuf};

/// EXIF-style rendering used for both the photo tag and the video fields
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "3gp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Classify a lower-cased extension, `None` if the file is not eligible
    pub fn from_extension(ext: &str) -> Option<Self> {
        if PHOTO_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Photo)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => write!(f, "photo"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Which media kinds a batch run picks up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaKindFilter {
    Photo,
    Video,
    #[default]
    All,
}

impl MediaKindFilter {
    pub fn accepts(&self, kind: MediaKind) -> bool {
        match self {
            MediaKindFilter::Photo => kind == MediaKind::Photo,
            MediaKindFilter::Video => kind == MediaKind::Video,
            MediaKindFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaFile {
    pub path: PathBuf,
    pub filename: String,
    pub kind: MediaKind,
    pub extension: String,
}

impl MediaFile {
    /// Build a media file from a path, `None` for names without an eligible extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_string_lossy().to_string();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase())?;
        let kind = MediaKind::from_extension(&extension)?;

        Some(Self {
            path: path.to_path_buf(),
            filename,
            kind,
            extension,
        })
    }
}

/// Wall-clock capture time with whole-second precision and no zone attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureTimestamp(NaiveDateTime);

impl CaptureTimestamp {
    pub fn new(datetime: NaiveDateTime) -> Self {
        // with_nanosecond(0) is always in range
        Self(datetime.with_nanosecond(0).unwrap_or(datetime))
    }

    /// Parse an EXIF/exiftool date string.
    ///
    /// Only the leading `YYYY:MM:DD HH:MM:SS` is considered, so sub-seconds
    /// (`.123`) and zone suffixes (`+08:00`, `Z`) are ignored. The all-zero
    /// sentinel and anything malformed yield `None`.
    pub fn parse_exif(value: &str) -> Option<Self> {
        let value = value.trim().trim_matches('\0');
        if is_zero_timestamp(value) {
            return None;
        }
        let main_part = value.get(..19)?;
        NaiveDateTime::parse_from_str(main_part, EXIF_DATETIME_FORMAT)
            .ok()
            .map(Self::new)
    }

    pub fn to_exif_string(&self) -> String {
        self.0.format(EXIF_DATETIME_FORMAT).to_string()
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for CaptureTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for CaptureTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// True for `0000:00:00 00:00:00` and its variants written by cameras without a clock
pub fn is_zero_timestamp(value: &str) -> bool {
    let digits: String = value.chars().take(19).filter(|c| c.is_ascii_digit()).collect();
    !digits.is_empty() && digits.chars().all(|c| c == '0')
}

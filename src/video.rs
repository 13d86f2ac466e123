/**
 * Video capture date reading and writing through an external metadata tool
 *
 * QuickTime/MP4 date fields are stored in UTC, so filename-derived local
 * wall-clock timestamps are converted before they are written.
 */

use chrono::{Local, NaiveDateTime, TimeZone};
use log::debug;
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{ReadError, WriteError};
use crate::media::{CaptureTimestamp, EXIF_DATETIME_FORMAT};
use crate::reconcile::{CaptureMetadataReader, CaptureMetadataWriter};

pub const DEFAULT_EXIFTOOL: &str = "exiftool";

/// Read precedence: media header, then movie header, then track header
pub const READ_PRECEDENCE: [&str; 3] = ["MediaCreateDate", "CreateDate", "TrackCreateDate"];

/// Fields set together on every write
pub const WRITE_FIELDS: [&str; 5] = [
    "CreateDate",
    "MediaCreateDate",
    "MediaModifyDate",
    "TrackCreateDate",
    "TrackModifyDate",
];

/// One record of tag name to value, as reported by the metadata tool
pub type VideoRecord = Map<String, Value>;

/// Narrow capability over a video metadata backend.
///
/// `write` assigns every field in one call, clears any auxiliary XMP packet
/// and must not leave a backup copy next to the file.
pub trait VideoMetadataClient: Send + Sync {
    fn read(&self, path: &Path) -> Result<VideoRecord, ReadError>;
    fn write(&self, path: &Path, fields: &[(String, String)]) -> Result<(), WriteError>;
}

/// Process-based client for ExifTool
#[derive(Debug, Clone)]
pub struct ExifToolClient {
    program: PathBuf,
}

impl ExifToolClient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl Default for ExifToolClient {
    fn default() -> Self {
        Self::new(DEFAULT_EXIFTOOL)
    }
}

impl VideoMetadataClient for ExifToolClient {
    fn read(&self, path: &Path) -> Result<VideoRecord, ReadError> {
        debug!("Querying {} for {}", self.program_name(), path.display());

        let output = Command::new(&self.program)
            .args(read_args(path))
            .output()
            .map_err(|source| ReadError::Spawn {
                program: self.program_name(),
                source,
            })?;

        if !output.status.success() {
            return Err(ReadError::ToolFailed {
                program: self.program_name(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_exiftool_json(&output.stdout)
    }

    fn write(&self, path: &Path, fields: &[(String, String)]) -> Result<(), WriteError> {
        let output = Command::new(&self.program)
            .args(write_args(path, fields))
            .output()
            .map_err(|source| WriteError::Spawn {
                program: self.program_name(),
                source,
            })?;

        if !output.status.success() {
            return Err(WriteError::ToolFailed {
                program: self.program_name(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

pub fn read_args(path: &Path) -> Vec<OsString> {
    vec![OsString::from("-json"), path.as_os_str().to_os_string()]
}

pub fn write_args(path: &Path, fields: &[(String, String)]) -> Vec<OsString> {
    let mut args = vec![path.as_os_str().to_os_string()];
    for (tag, value) in fields {
        args.push(OsString::from(format!("-{}={}", tag, value)));
    }
    args.push(OsString::from("-overwrite_original"));
    args.push(OsString::from("-xmp="));
    args
}

/// Decode `exiftool -json` output and return its first record
pub fn parse_exiftool_json(stdout: &[u8]) -> Result<VideoRecord, ReadError> {
    let records: Vec<VideoRecord> =
        serde_json::from_slice(stdout).map_err(|e| ReadError::MalformedOutput(e.to_string()))?;
    records
        .into_iter()
        .next()
        .ok_or_else(|| ReadError::MalformedOutput("empty record array".to_string()))
}

/// Pick the capture date from a record, skipping zero sentinels and malformed values
pub fn select_capture_date(record: &VideoRecord) -> Option<CaptureTimestamp> {
    for key in READ_PRECEDENCE {
        let Some(raw) = record.get(key).and_then(Value::as_str) else {
            continue;
        };
        match CaptureTimestamp::parse_exif(raw) {
            Some(timestamp) => return Some(timestamp),
            None => debug!("Skipping {} = '{}'", key, raw),
        }
    }
    None
}

/// Convert a local wall-clock timestamp in `tz` to a UTC wall-clock time.
///
/// Ambiguous local times (DST fold) take the earlier instant; times that do
/// not exist locally (DST gap) are an error.
pub fn to_utc<Tz: TimeZone>(timestamp: CaptureTimestamp, tz: &Tz) -> Result<NaiveDateTime, WriteError> {
    tz.from_local_datetime(&timestamp.naive())
        .earliest()
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| WriteError::NonexistentLocalTime(timestamp.to_string()))
}

/// Video capture date reader/writer over a [`VideoMetadataClient`]
pub struct VideoMetadata<C, Tz = Local> {
    client: C,
    zone: Tz,
}

impl<C: VideoMetadataClient> VideoMetadata<C, Local> {
    pub fn new(client: C) -> Self {
        Self { client, zone: Local }
    }
}

impl<C: VideoMetadataClient, Tz: TimeZone> VideoMetadata<C, Tz> {
    /// Interpret timestamps handed to `write` as wall-clock times in `zone`
    pub fn with_zone(client: C, zone: Tz) -> Self {
        Self { client, zone }
    }

    pub fn read_capture_date(&self, path: &Path) -> Result<Option<CaptureTimestamp>, ReadError> {
        let record = self.client.read(path)?;
        Ok(select_capture_date(&record))
    }

    pub fn write_capture_date(&self, path: &Path, timestamp: CaptureTimestamp) -> Result<(), WriteError> {
        let utc = to_utc(timestamp, &self.zone)?;
        let value = utc.format(EXIF_DATETIME_FORMAT).to_string();
        debug!("Writing {} (UTC) for local {} to {}", value, timestamp, path.display());

        let fields: Vec<(String, String)> = WRITE_FIELDS
            .iter()
            .map(|field| (field.to_string(), value.clone()))
            .collect();
        self.client.write(path, &fields)
    }
}

impl<C, Tz> CaptureMetadataReader for VideoMetadata<C, Tz>
where
    C: VideoMetadataClient,
    Tz: TimeZone + Send + Sync,
{
    fn read_capture_date(&self, path: &Path) -> Result<Option<CaptureTimestamp>, ReadError> {
        VideoMetadata::read_capture_date(self, path)
    }
}

impl<C, Tz> CaptureMetadataWriter for VideoMetadata<C, Tz>
where
    C: VideoMetadataClient,
    Tz: TimeZone + Send + Sync,
{
    fn write_capture_date(&self, path: &Path, timestamp: CaptureTimestamp) -> Result<(), WriteError> {
        VideoMetadata::write_capture_date(self, path, timestamp)
    }
}

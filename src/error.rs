/**
 * Error types for metadata reads, metadata writes and batch runs
 */

use std::path::PathBuf;
use thiserror::Error;

/// Why an embedded capture timestamp could not be read.
///
/// The reconciler treats every variant as "absent"; the distinction only
/// feeds the logs.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unreadable image container: {0}")]
    Container(String),
    #[error("unreadable EXIF block: {0}")]
    Exif(#[from] exif::Error),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("malformed metadata output: {0}")]
    MalformedOutput(String),
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported or corrupt container: {0}")]
    Container(String),
    #[error("failed to encode EXIF data: {0}")]
    Exif(#[from] exif::Error),
    #[error("encoded payload changed while splicing metadata into {0}")]
    PayloadChanged(PathBuf),
    #[error("local time {0} has no UTC equivalent")]
    NonexistentLocalTime(String),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Conditions that stop a run before any file is dispatched
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid folder {path}: {reason}")]
    InvalidFolder { path: PathBuf, reason: String },
    #[error("invalid filename pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/**
 * Filename timestamp extraction
 *
 * Messaging apps and some cameras name exported media after the capture
 * instant in epoch milliseconds, e.g. `mmexport1700000000000.jpg`.
 */

use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use log::debug;
use regex::Regex;
use std::path::Path;

use crate::media::CaptureTimestamp;

pub const DEFAULT_DIGIT_RUN_LENGTH: usize = 13;

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    pub digit_run_length: usize,
    /// Inclusive lower bound on the local wall-clock result
    pub range_start: Option<NaiveDateTime>,
    /// Inclusive upper bound on the local wall-clock result
    pub range_end: Option<NaiveDateTime>,
    /// Only accept a run that ends the file stem, i.e. the last N characters before the extension
    pub anchor_tail: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            digit_run_length: DEFAULT_DIGIT_RUN_LENGTH,
            range_start: None,
            range_end: None,
            anchor_tail: false,
        }
    }
}

pub struct FilenameTimestampExtractor {
    pattern: Regex,
    config: ExtractorConfig,
}

impl FilenameTimestampExtractor {
    /// Compile the digit-run pattern; fails only for absurd run lengths
    pub fn new(config: ExtractorConfig) -> Result<Self, regex::Error> {
        let anchor = if config.anchor_tail { "$" } else { "" };
        let pattern = Regex::new(&format!(r"\d{{{}}}{}", config.digit_run_length.max(1), anchor))?;
        Ok(Self { pattern, config })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract a capture timestamp rendered in the machine's local zone
    pub fn extract(&self, filename: &str) -> Option<CaptureTimestamp> {
        self.extract_in(filename, &Local)
    }

    /// Extract a capture timestamp rendered in `tz`.
    ///
    /// The first run of `digit_run_length` digits wins, or with `anchor_tail`
    /// the run ending the stem. Runs with a leading zero, instants in the
    /// future, values outside the configured range and integer overflow all
    /// yield `None`.
    pub fn extract_in<Tz: TimeZone>(&self, filename: &str, tz: &Tz) -> Option<CaptureTimestamp> {
        let haystack = if self.config.anchor_tail {
            Path::new(filename).file_stem()?.to_str()?
        } else {
            filename
        };
        let run = self.pattern.find(haystack)?.as_str();

        if run.starts_with('0') {
            debug!("Ignoring zero-padded digit run '{}' in {}", run, filename);
            return None;
        }

        let millis: i64 = match run.parse() {
            Ok(value) => value,
            Err(e) => {
                debug!("Digit run '{}' in {} is not a timestamp: {}", run, filename, e);
                return None;
            }
        };

        if millis > Utc::now().timestamp_millis() {
            debug!("Ignoring future timestamp {} in {}", millis, filename);
            return None;
        }

        let local = tz.timestamp_millis_opt(millis).single()?.naive_local();

        if let Some(start) = self.config.range_start {
            if local < start {
                return None;
            }
        }
        if let Some(end) = self.config.range_end {
            if local > end {
                return None;
            }
        }

        Some(CaptureTimestamp::new(local))
    }
}

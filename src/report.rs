/**
 * Console and JSON rendering of a batch report
 */

use chrono::NaiveDateTime;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use crate::file_ops::BatchReport;
use crate::media::MediaFile;
use crate::reconcile::{ReconcileMode, ReconciliationResult, WriteOutcome};

/// Write counts followed by per-file listings sorted by filename
pub fn render(report: &BatchReport, mode: ReconcileMode, out: &mut impl Write) -> io::Result<()> {
    let recovered = report.recovered().count();

    writeln!(out, "Files scanned: {}", report.candidates)?;
    writeln!(out, "With capture timestamp: {}", report.with_timestamp.len())?;
    writeln!(out, "  embedded: {}", report.embedded_count())?;
    writeln!(out, "  from filename: {}", recovered)?;
    writeln!(out, "Missing capture timestamp: {}", report.unrecoverable.len())?;

    if mode == ReconcileMode::Apply {
        writeln!(out, "Written: {}", report.written_count())?;
        writeln!(out, "Write failures: {}", report.write_failures().len())?;
    }

    let mut with: Vec<&ReconciliationResult> = report.with_timestamp.iter().collect();
    with.sort_by(|a, b| a.file().filename.cmp(&b.file().filename));
    if !with.is_empty() {
        writeln!(out, "\nWith capture timestamp:")?;
        for result in with {
            writeln!(out, "  {}", describe(result))?;
        }
    }

    let mut missing: Vec<&MediaFile> = report.unrecoverable.iter().collect();
    missing.sort_by(|a, b| a.filename.cmp(&b.filename));
    if !missing.is_empty() {
        writeln!(out, "\nMissing capture timestamp:")?;
        for file in missing {
            writeln!(out, "  {}", file.filename)?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    candidates: usize,
    with_timestamp: Vec<JsonEntry<'a>>,
    missing: Vec<&'a Path>,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    path: &'a Path,
    timestamp: NaiveDateTime,
    source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    write: Option<String>,
}

/// Machine-readable variant of [`render`], one JSON document
pub fn render_json(report: &BatchReport, out: &mut impl Write) -> io::Result<()> {
    let mut with_timestamp: Vec<JsonEntry> = report
        .with_timestamp
        .iter()
        .filter_map(|result| {
            let timestamp = result.timestamp()?.naive();
            let (source, write) = match result {
                ReconciliationResult::RecoveredFromFilename { write, .. } => ("filename", Some(outcome_label(write))),
                _ => ("embedded", None),
            };
            Some(JsonEntry {
                path: &result.file().path,
                timestamp,
                source,
                write,
            })
        })
        .collect();
    with_timestamp.sort_by(|a, b| a.path.cmp(b.path));

    let mut missing: Vec<&Path> = report.unrecoverable.iter().map(|f| f.path.as_path()).collect();
    missing.sort();

    let doc = JsonReport {
        candidates: report.candidates,
        with_timestamp,
        missing,
    };
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)
}

fn outcome_label(write: &WriteOutcome) -> String {
    match write {
        WriteOutcome::Written => "written".to_string(),
        WriteOutcome::Skipped => "skipped".to_string(),
        WriteOutcome::Failed(reason) => format!("failed: {}", reason),
    }
}

fn describe(result: &ReconciliationResult) -> String {
    match result {
        ReconciliationResult::HasEmbeddedTimestamp { file, timestamp } => {
            format!("{}  {}  (embedded)", file.filename, timestamp)
        }
        ReconciliationResult::RecoveredFromFilename { file, timestamp, write } => {
            let outcome = match write {
                WriteOutcome::Written => "written".to_string(),
                WriteOutcome::Skipped => "from filename".to_string(),
                WriteOutcome::Failed(reason) => format!("write failed: {}", reason),
            };
            format!("{}  {}  ({})", file.filename, timestamp, outcome)
        }
        ReconciliationResult::Unrecoverable { file } => file.filename.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::CaptureTimestamp;
    use chrono::NaiveDate;

    fn media(name: &str) -> MediaFile {
        MediaFile::from_path(&Path::new("/media").join(name)).unwrap()
    }

    fn ts() -> CaptureTimestamp {
        NaiveDate::from_ymd_opt(2023, 11, 14)
            .unwrap()
            .and_hms_opt(22, 13, 20)
            .unwrap()
            .into()
    }

    fn sample_report() -> BatchReport {
        let mut report = BatchReport::new(4);
        report.push(ReconciliationResult::Unrecoverable { file: media("zz.jpg") });
        report.push(ReconciliationResult::RecoveredFromFilename {
            file: media("IMG_1700000000000.jpg"),
            timestamp: ts(),
            write: WriteOutcome::Failed("disk full".to_string()),
        });
        report.push(ReconciliationResult::HasEmbeddedTimestamp {
            file: media("camera.jpg"),
            timestamp: ts(),
        });
        report.push(ReconciliationResult::Unrecoverable { file: media("aa.mp4") });
        report
    }

    #[test]
    fn test_render_apply() {
        let mut out = Vec::new();
        render(&sample_report(), ReconcileMode::Apply, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Files scanned: 4"));
        assert!(text.contains("With capture timestamp: 2"));
        assert!(text.contains("  from filename: 1"));
        assert!(text.contains("Missing capture timestamp: 2"));
        assert!(text.contains("Write failures: 1"));
        assert!(text.contains("IMG_1700000000000.jpg  2023-11-14 22:13:20  (write failed: disk full)"));
        assert!(text.contains("camera.jpg  2023-11-14 22:13:20  (embedded)"));

        // Listings are sorted by filename
        let aa = text.find("  aa.mp4").unwrap();
        let zz = text.find("  zz.jpg").unwrap();
        assert!(aa < zz);
        let img = text.find("  IMG_1700000000000.jpg").unwrap();
        let camera = text.find("  camera.jpg").unwrap();
        assert!(img < camera);
    }

    #[test]
    fn test_render_json() {
        let mut out = Vec::new();
        render_json(&sample_report(), &mut out).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(doc["candidates"], 4);
        assert_eq!(doc["missing"], serde_json::json!(["/media/aa.mp4", "/media/zz.jpg"]));
        let entries = doc["with_timestamp"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["path"], "/media/IMG_1700000000000.jpg");
        assert_eq!(entries[0]["timestamp"], "2023-11-14T22:13:20");
        assert_eq!(entries[0]["source"], "filename");
        assert_eq!(entries[0]["write"], "failed: disk full");
        assert_eq!(entries[1]["source"], "embedded");
        assert!(entries[1].get("write").is_none());
    }

    #[test]
    fn test_render_dry_run_has_no_write_counts() {
        let mut out = Vec::new();
        render(&sample_report(), ReconcileMode::DryRun, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("Written:"));
        assert!(!text.contains("Write failures:"));
    }
}

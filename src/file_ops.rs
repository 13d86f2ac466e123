/**
 * Batch coordination: folder listing, parallel reconciliation and result aggregation
 */

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use walkdir::WalkDir;

use crate::error::BatchError;
use crate::media::{MediaFile, MediaKindFilter};
use crate::naming::{ExtractorConfig, FilenameTimestampExtractor};
use crate::reconcile::{Backends, FileReconciler, ReconcileMode, ReconciliationResult, WriteOutcome};

/// Settings for one batch run. The kind filter is per run and goes to [`BatchCoordinator::run`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub extractor: ExtractorConfig,
    pub mode: ReconcileMode,
    /// Worker pool size, CPU count when `None`
    pub workers: Option<usize>,
    pub show_progress: bool,
}

/// Aggregated outcome of one run, filled in completion order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub candidates: usize,
    pub with_timestamp: Vec<ReconciliationResult>,
    pub unrecoverable: Vec<MediaFile>,
}

impl BatchReport {
    pub fn new(candidates: usize) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn push(&mut self, result: ReconciliationResult) {
        match result {
            ReconciliationResult::Unrecoverable { file } => self.unrecoverable.push(file),
            other => self.with_timestamp.push(other),
        }
    }

    pub fn processed(&self) -> usize {
        self.with_timestamp.len() + self.unrecoverable.len()
    }

    pub fn embedded_count(&self) -> usize {
        self.with_timestamp
            .iter()
            .filter(|r| matches!(r, ReconciliationResult::HasEmbeddedTimestamp { .. }))
            .count()
    }

    pub fn recovered(&self) -> impl Iterator<Item = (&MediaFile, &WriteOutcome)> {
        self.with_timestamp.iter().filter_map(|r| match r {
            ReconciliationResult::RecoveredFromFilename { file, write, .. } => Some((file, write)),
            _ => None,
        })
    }

    pub fn written_count(&self) -> usize {
        self.recovered()
            .filter(|(_, write)| **write == WriteOutcome::Written)
            .count()
    }

    pub fn write_failures(&self) -> Vec<(&MediaFile, &str)> {
        self.recovered()
            .filter_map(|(file, write)| match write {
                WriteOutcome::Failed(reason) => Some((file, reason.as_str())),
                _ => None,
            })
            .collect()
    }
}

pub struct BatchCoordinator {
    reconciler: FileReconciler,
    workers: Option<usize>,
    show_progress: bool,
}

impl BatchCoordinator {
    pub fn new(reconciler: FileReconciler, workers: Option<usize>) -> Self {
        Self {
            reconciler,
            workers,
            show_progress: false,
        }
    }

    /// Build the extractor and reconciler described by `options`
    pub fn from_options(options: &BatchOptions, backends: Backends) -> Result<Self, BatchError> {
        let extractor = FilenameTimestampExtractor::new(options.extractor.clone())?;
        let reconciler = FileReconciler::new(extractor, backends, options.mode);
        Ok(Self::new(reconciler, options.workers).with_progress(options.show_progress))
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn mode(&self) -> ReconcileMode {
        self.reconciler.mode()
    }

    /// List the eligible files directly inside `folder`, sorted by name.
    ///
    /// Fails before anything is dispatched when the folder is missing, not a
    /// directory or unreadable. Unreadable individual entries are skipped.
    pub fn collect_candidates(folder: &Path, filter: MediaKindFilter) -> Result<Vec<MediaFile>, BatchError> {
        let root = folder.canonicalize().map_err(|e| BatchError::InvalidFolder {
            path: folder.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !root.is_dir() {
            return Err(BatchError::InvalidFolder {
                path: folder.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut candidates = Vec::new();
        for entry in WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(BatchError::InvalidFolder {
                        path: folder.to_path_buf(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            match MediaFile::from_path(entry.path()) {
                Some(file) if filter.accepts(file.kind) => candidates.push(file),
                Some(file) => debug!("Filtered out {} ({})", file.filename, file.kind),
                None => debug!("Ignoring {}", entry.path().display()),
            }
        }

        Ok(candidates)
    }

    /// Reconcile every eligible file in `folder` on a bounded worker pool
    pub fn run(&self, folder: &Path, filter: MediaKindFilter) -> Result<BatchReport, BatchError> {
        let candidates = Self::collect_candidates(folder, filter)?;
        let mut report = BatchReport::new(candidates.len());
        info!("Found {} candidate files in {}", candidates.len(), folder.display());

        if candidates.is_empty() {
            return Ok(report);
        }

        let threads = self.workers.unwrap_or_else(num_cpus::get).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("datefill-worker-{}", i))
            .build()?;
        info!("Reconciling with {} worker threads (CPUs: {})", threads, num_cpus::get());

        let pb = self.progress_bar(candidates.len());
        let reconciler = &self.reconciler;
        let (tx, rx) = mpsc::channel();

        thread::scope(|scope| {
            scope.spawn(move || {
                pool.install(|| {
                    candidates.par_iter().for_each_with(tx, |tx, file| {
                        // The receiver outlives every sender
                        let _ = tx.send(reconciler.reconcile(file));
                    });
                });
            });

            for result in rx {
                pb.inc(1);
                report.push(result);
            }
        });

        pb.finish_with_message("Reconciliation complete");
        Ok(report)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1} files/s) ETA: {eta} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Reconciling");
        pb
    }
}

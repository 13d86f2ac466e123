use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::io;
use std::path::PathBuf;

use datefill_rs::file_ops::{BatchCoordinator, BatchOptions};
use datefill_rs::media::MediaKindFilter;
use datefill_rs::naming::{ExtractorConfig, DEFAULT_DIGIT_RUN_LENGTH};
use datefill_rs::reconcile::{Backends, ReconcileMode};
use datefill_rs::report;
use datefill_rs::video::DEFAULT_EXIFTOOL;

#[derive(Parser)]
#[command(name = "datefill")]
#[command(version)]
#[command(about = "Backfill missing capture timestamps on photos and videos from their filenames")]
#[command(long_about = "Finds photos and videos without an embedded capture timestamp and recovers one from a 13-digit epoch-millisecond run in the filename (e.g. mmexport1700000000000.jpg).

Photos: DateTimeOriginal is written into the EXIF block; the encoded image is never re-encoded.
Videos: CreateDate, MediaCreateDate, MediaModifyDate, TrackCreateDate and TrackModifyDate are written in UTC via exiftool.

Supported file types: JPG, JPEG, PNG, WEBP, MP4, MOV, AVI, MKV, 3GP
Only the immediate contents of the folder are processed.")]
struct Cli {
    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which files have a capture timestamp, without modifying anything
    Scan(RunArgs),
    /// Write filename timestamps into files that have no embedded capture timestamp
    Fix(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Folder to process (not recursive)
    folder: PathBuf,
    /// Media kinds to process
    #[arg(short, long, value_enum, default_value_t = KindArg::All)]
    kind: KindArg,
    /// Number of parallel workers (default: CPU count)
    #[arg(short, long)]
    workers: Option<usize>,
    /// Length of the epoch-millisecond digit run in filenames
    #[arg(long, default_value_t = DEFAULT_DIGIT_RUN_LENGTH, value_parser = parse_digits)]
    digits: usize,
    /// Only accept a digit run that ends the file stem (e.g. clip_1700000000000.mp4)
    #[arg(long)]
    tail: bool,
    /// Ignore filename timestamps earlier than this (YYYY-MM-DD[ HH:MM:SS])
    #[arg(long, value_parser = parse_lower_bound)]
    after: Option<NaiveDateTime>,
    /// Ignore filename timestamps later than this (YYYY-MM-DD[ HH:MM:SS])
    #[arg(long, value_parser = parse_upper_bound)]
    before: Option<NaiveDateTime>,
    /// exiftool executable used for video metadata
    #[arg(long, env = "DATEFILL_EXIFTOOL", default_value = DEFAULT_EXIFTOOL)]
    exiftool: PathBuf,
    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Photo,
    Video,
    All,
}

impl From<KindArg> for MediaKindFilter {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Photo => MediaKindFilter::Photo,
            KindArg::Video => MediaKindFilter::Video,
            KindArg::All => MediaKindFilter::All,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose)?;

    info!("Starting datefill");

    match cli.command {
        Commands::Scan(args) => run(args, ReconcileMode::DryRun),
        Commands::Fix(args) => run(args, ReconcileMode::Apply),
    }
}

fn setup_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    Ok(())
}

fn run(args: RunArgs, mode: ReconcileMode) -> Result<()> {
    if let (Some(after), Some(before)) = (args.after, args.before) {
        if after > before {
            anyhow::bail!("--after ({}) is later than --before ({})", after, before);
        }
    }

    let options = BatchOptions {
        extractor: ExtractorConfig {
            digit_run_length: args.digits,
            range_start: args.after,
            range_end: args.before,
            anchor_tail: args.tail,
        },
        mode,
        workers: args.workers,
        show_progress: !args.no_progress && !args.json,
    };

    let coordinator = BatchCoordinator::from_options(&options, Backends::native(&args.exiftool))
        .context("Failed to set up reconciliation")?;
    let batch = coordinator
        .run(&args.folder, args.kind.into())
        .with_context(|| format!("Failed to process folder {}", args.folder.display()))?;

    info!(
        "Processed {} files: {} with timestamp, {} missing",
        batch.processed(),
        batch.with_timestamp.len(),
        batch.unrecoverable.len()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        report::render_json(&batch, &mut out).context("Failed to write report")?;
    } else {
        report::render(&batch, mode, &mut out).context("Failed to write report")?;
    }

    Ok(())
}

fn parse_digits(value: &str) -> Result<usize, String> {
    let digits: usize = value.parse().map_err(|e| format!("{}", e))?;
    if digits == 0 {
        return Err("digit run length must be at least 1".to_string());
    }
    Ok(digits)
}

/// `YYYY-MM-DD HH:MM:SS`, or a bare date meaning `time` on that day
fn parse_bound(value: &str, time: (u32, u32, u32)) -> Result<NaiveDateTime, String> {
    let value = value.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(datetime);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("expected YYYY-MM-DD or 'YYYY-MM-DD HH:MM:SS', got '{}'", value))?;
    date.and_hms_opt(time.0, time.1, time.2)
        .ok_or_else(|| format!("invalid date '{}'", value))
}

fn parse_lower_bound(value: &str) -> Result<NaiveDateTime, String> {
    parse_bound(value, (0, 0, 0))
}

fn parse_upper_bound(value: &str) -> Result<NaiveDateTime, String> {
    parse_bound(value, (23, 59, 59))
}

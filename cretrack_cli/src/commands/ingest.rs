//! The `ingest` subcommand: batch-import CSV exports into the tracker.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::Local;
use clap::Args;
use cretrack_lib::{read_uploads, CreTrackerError, Db, IngestReport, TrackerConfig};
use indicatif::{ProgressBar, ProgressStyle};

use super::{open_tracker, LAST_STATUS_KEY};
use crate::output::{print_ingest_report, OutputFormat};

#[derive(Args)]
pub struct IngestArgs {
    /// CSV files to import (company, contact, project or property exports)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

pub async fn run(
    args: &IngestArgs,
    db_path: &Path,
    config: TrackerConfig,
    format: &OutputFormat,
) -> Result<()> {
    let pb = ProgressBar::new(args.files.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}/{len:3} {msg}",
    )?);
    pb.set_message("reading files...");

    let uploads = read_uploads(&args.files, config.max_upload_bytes).await;
    pb.set_position(args.files.len() as u64);
    pb.set_message("processing rows...");

    let mut tracker = open_tracker(db_path, config)?;
    let today = Local::now().date_naive();
    let result = tracker.ingest_batch(uploads, today);
    pb.finish_and_clear();

    let result = record_outcome(tracker.store(), tracker.status(), result);

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", tracker.status());
            return Err(e.into());
        }
    };

    print_ingest_report(&report, format)?;
    if !report.committed {
        bail!("{}", report.status);
    }
    eprintln!("{}", report.status);
    eprintln!(
        "Tracker now holds {} LLCs, {} clients, {} properties ({})",
        tracker.llcs().len(),
        tracker.clients().len(),
        tracker.properties().len(),
        db_path.display()
    );

    Ok(())
}

/// Store the last import status, then hand back the ingest result unchanged.
/// A failed status write is reported but never replaces the ingest outcome.
fn record_outcome(
    db: &Db,
    status: &str,
    result: Result<IngestReport, CreTrackerError>,
) -> Result<IngestReport, CreTrackerError> {
    if let Err(e) = db.set_meta(LAST_STATUS_KEY, status) {
        eprintln!("Warning: could not record import status: {}", e);
    }
    result
}

//! The `summary` subcommand: overview counts and the last ingestion status.

use std::path::Path;

use anyhow::Result;
use chrono::Local;
use cretrack_lib::query::summarize;
use cretrack_lib::TrackerConfig;

use super::{open_tracker, LAST_STATUS_KEY};
use crate::output::{print_summary, OutputFormat};

pub fn run(db_path: &Path, config: TrackerConfig, format: &OutputFormat) -> Result<()> {
    let tracker = open_tracker(db_path, config)?;
    let summary = summarize(tracker.dataset(), Local::now().date_naive());
    print_summary(&summary, format)?;

    if let Some(status) = tracker.store().get_meta(LAST_STATUS_KEY)? {
        eprintln!("Last import: {}", status);
    }

    Ok(())
}

//! CLI subcommand implementations.

pub mod ingest;
pub mod list;
pub mod summary;

use std::path::Path;

use anyhow::Result;
use cretrack_lib::{Db, Tracker, TrackerConfig};

/// Meta key holding the status string of the most recent ingestion.
pub const LAST_STATUS_KEY: &str = "last_status";

/// Open (creating if needed) the SQLite store and load the tracker from it.
pub fn open_tracker(db_path: &Path, config: TrackerConfig) -> Result<Tracker<Db>> {
    let db = Db::open(db_path)?;
    db.init()?;
    Ok(Tracker::open(db, config)?)
}

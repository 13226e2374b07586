//! Library layer for the CRE tracker: CSV ingestion, entity reconciliation
//! and persistence of LLCs, Clients and Properties.
//!
//! Arbitrary broker and county-records exports are classified, mapped onto
//! the relational model, fuzzily deduplicated and reconciled before being
//! committed through a pluggable blob store.

pub mod config;
pub mod db;
pub mod dedup;
pub mod error;
pub mod field_map;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod process;
pub mod query;
pub mod reconcile;
pub mod schema;
pub mod store;
pub mod validation;

pub use config::{ConfigError, TrackerConfig};
pub use db::{Db, DbError};
pub use error::CreTrackerError;
pub use ingest::{
    read_uploads, FileError, FileReport, IngestReport, Tracker, Upload, PROCESSING_ERROR_STATUS,
};
pub use models::{Client, Dataset, Llc, Property};
pub use query::{Page, Summary};
pub use schema::SchemaKind;
pub use store::{BlobStore, MemoryStore, StoreError};

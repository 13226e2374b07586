//! Ingestion orchestrator: reads uploads, drives every row of every file
//! through the row processor against one shared working copy, then
//! deduplicates, reconciles and commits the result in one step.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::config::TrackerConfig;
use crate::dedup::dedupe_dataset;
use crate::error::CreTrackerError;
use crate::field_map::Row;
use crate::models::{Client, Dataset, Llc, Property};
use crate::normalize::{clean_cell, normalize_header};
use crate::process::{process_row, RowContext, RowOutcome};
use crate::reconcile::{reconcile, repair_dataset, verify_invariants};
use crate::schema::{classify, SchemaKind};
use crate::store::{load_collection, BlobStore, CLIENTS_KEY, LLCS_KEY, PROPERTIES_KEY};

/// Status shown when a batch aborts on an unexpected fault.
pub const PROCESSING_ERROR_STATUS: &str = "An error occurred while processing the CSV files.";

/// Status shown when the committed state could not be written.
pub const SAVE_ERROR_STATUS: &str = "An error occurred while saving the imported data.";

/// File-level rejections. The file contributes no rows; other files in the
/// batch continue.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("{name}: please upload a valid CSV file")]
    WrongExtension { name: String },
    #[error("{name}: file is {size} bytes, the limit is {max} bytes")]
    TooLarge { name: String, size: u64, max: u64 },
    #[error("{name}: file is empty")]
    Empty { name: String },
    #[error("{name}: an error occurred while reading the file: {reason}")]
    Unreadable { name: String, reason: String },
    #[error("{name}: CSV parse error: {reason}")]
    Parse { name: String, reason: String },
}

impl FileError {
    /// Name of the rejected file.
    pub fn file_name(&self) -> &str {
        match self {
            Self::WrongExtension { name }
            | Self::TooLarge { name, .. }
            | Self::Empty { name }
            | Self::Unreadable { name, .. }
            | Self::Parse { name, .. } => name,
        }
    }
}

/// Raw bytes of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A classified file with its cleaned rows.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub name: String,
    pub kind: SchemaKind,
    pub rows: Vec<Row>,
}

/// Per-file line of an ingestion report.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub name: String,
    pub kind: Option<SchemaKind>,
    pub processed: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

/// Outcome of one ingestion attempt.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub processed: usize,
    pub skipped: usize,
    pub files: Vec<FileReport>,
    pub status: String,
    /// False when nothing was written (every file was rejected).
    pub committed: bool,
}

fn has_csv_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Reject uploads that are not `.csv`, exceed `max_bytes`, or carry no bytes.
pub fn validate_upload(upload: &Upload, max_bytes: u64) -> Result<(), FileError> {
    if !has_csv_extension(&upload.name) {
        return Err(FileError::WrongExtension {
            name: upload.name.clone(),
        });
    }
    let size = upload.bytes.len() as u64;
    if size > max_bytes {
        return Err(FileError::TooLarge {
            name: upload.name.clone(),
            size,
            max: max_bytes,
        });
    }
    if size == 0 {
        return Err(FileError::Empty {
            name: upload.name.clone(),
        });
    }
    Ok(())
}

fn decode_utf16(name: &str, body: &[u8], from: fn([u8; 2]) -> u16) -> Result<String, FileError> {
    if body.len() % 2 != 0 {
        return Err(FileError::Unreadable {
            name: name.to_string(),
            reason: "truncated UTF-16 data".into(),
        });
    }
    let units = body.chunks_exact(2).map(|pair| from([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|e| FileError::Unreadable {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

/// Decode upload bytes to text. A UTF-8 BOM is stripped and UTF-16 with a
/// BOM is transcoded; anything else must be valid UTF-8.
pub fn decode_upload(name: &str, bytes: &[u8]) -> Result<String, FileError> {
    if let Some(body) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return utf8(name, body);
    }
    if let Some(body) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(name, body, u16::from_le_bytes);
    }
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(name, body, u16::from_be_bytes);
    }
    utf8(name, bytes)
}

fn utf8(name: &str, bytes: &[u8]) -> Result<String, FileError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| FileError::Unreadable {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Decode, parse and classify one upload.
///
/// Ragged records are tolerated; any other CSV error rejects the file.
pub fn parse_upload(upload: &Upload) -> Result<ParsedFile, FileError> {
    let name = upload.name.clone();
    let text = decode_upload(&name, &upload.bytes)?;
    if text.trim().is_empty() {
        return Err(FileError::Empty { name });
    }

    let parse_err = |e: csv::Error| FileError::Parse {
        name: upload.name.clone(),
        reason: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_err)?
        .iter()
        .map(|h| normalize_header(&clean_cell(h)))
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(FileError::Empty { name });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_err)?;
        rows.push(Row::from_record(&headers, record.iter()));
    }

    let kind = classify(&headers);
    Ok(ParsedFile { name, kind, rows })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read one file from disk, checking extension and size before the read.
pub async fn read_upload(path: &Path, max_bytes: u64) -> Result<Upload, FileError> {
    let name = file_name_of(path);
    if !has_csv_extension(&name) {
        return Err(FileError::WrongExtension { name });
    }
    let unreadable = |e: std::io::Error| FileError::Unreadable {
        name: name.clone(),
        reason: e.to_string(),
    };
    let meta = tokio::fs::metadata(path).await.map_err(unreadable)?;
    if meta.len() > max_bytes {
        return Err(FileError::TooLarge {
            name,
            size: meta.len(),
            max: max_bytes,
        });
    }
    let bytes = tokio::fs::read(path).await.map_err(unreadable)?;
    let upload = Upload::new(name, bytes);
    validate_upload(&upload, max_bytes)?;
    Ok(upload)
}

/// Read every file concurrently. Results come back in input order.
pub async fn read_uploads(paths: &[PathBuf], max_bytes: u64) -> Vec<Result<Upload, FileError>> {
    let mut join_set = JoinSet::new();
    for (idx, path) in paths.iter().enumerate() {
        let path = path.clone();
        join_set.spawn(async move { (idx, read_upload(&path, max_bytes).await) });
    }

    let mut slots: Vec<Option<Result<Upload, FileError>>> =
        std::iter::repeat_with(|| None).take(paths.len()).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, result)) => slots[idx] = Some(result),
            Err(e) => tracing::error!("File read task failed: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(paths)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| {
                Err(FileError::Unreadable {
                    name: file_name_of(path),
                    reason: "read task aborted".into(),
                })
            })
        })
        .collect()
}

/// Owns the committed collections and the persistence gateway.
///
/// There is exactly one writer: every ingestion takes `&mut self` and runs
/// to completion before the next one can start.
pub struct Tracker<S: BlobStore> {
    store: S,
    config: TrackerConfig,
    data: Dataset,
    status: String,
}

impl<S: BlobStore> Tracker<S> {
    /// Load the three collections and bring them back to a consistent state:
    /// repair ids and dangling references, deduplicate, then reconcile.
    pub fn open(store: S, config: TrackerConfig) -> Result<Self, CreTrackerError> {
        let mut data = Dataset {
            llcs: load_collection(&store, LLCS_KEY)?,
            clients: load_collection(&store, CLIENTS_KEY)?,
            properties: load_collection(&store, PROPERTIES_KEY)?,
        };
        let repairs = repair_dataset(&mut data);
        if repairs > 0 {
            tracing::warn!("Repaired {} stored record(s) with bad ids or references", repairs);
        }
        let before = (data.llcs.len(), data.clients.len());
        dedupe_dataset(&mut data, config.dedup_threshold);
        if before != (data.llcs.len(), data.clients.len()) {
            tracing::info!(
                "Collapsed stored duplicates: {} -> {} LLCs, {} -> {} clients",
                before.0,
                data.llcs.len(),
                before.1,
                data.clients.len()
            );
        }
        reconcile(&mut data, config.dedup_threshold);
        Ok(Self {
            store,
            config,
            data,
            status: String::new(),
        })
    }

    pub fn llcs(&self) -> &[Llc] {
        &self.data.llcs
    }

    pub fn clients(&self) -> &[Client] {
        &self.data.clients
    }

    pub fn properties(&self) -> &[Property] {
        &self.data.properties
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    /// Result of the most recent ingestion attempt.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest a single upload. Runs the same dedup and reconcile passes as
    /// a batch.
    pub fn ingest_file(
        &mut self,
        upload: Upload,
        today: NaiveDate,
    ) -> Result<IngestReport, CreTrackerError> {
        self.ingest_batch(vec![Ok(upload)], today)
    }

    /// Ingest a batch against one shared working copy and commit once.
    ///
    /// Rejected files are reported and skipped. A pipeline fault aborts the
    /// whole batch and leaves the committed state untouched.
    pub fn ingest_batch(
        &mut self,
        uploads: Vec<Result<Upload, FileError>>,
        today: NaiveDate,
    ) -> Result<IngestReport, CreTrackerError> {
        let mut files = Vec::with_capacity(uploads.len());
        let mut parsed = Vec::new();
        for upload in uploads {
            let result = upload.and_then(|u| {
                validate_upload(&u, self.config.max_upload_bytes)?;
                parse_upload(&u)
            });
            match result {
                Ok(file) => parsed.push(file),
                Err(e) => {
                    tracing::warn!("Rejected {}", e);
                    files.push(FileReport {
                        name: e.file_name().to_string(),
                        kind: None,
                        processed: 0,
                        skipped: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if parsed.is_empty() {
            let status = match files.as_slice() {
                [] => "No files to process".to_string(),
                [only] => only.error.clone().unwrap_or_default(),
                many => format!("None of the {} files could be processed", many.len()),
            };
            self.status = status.clone();
            return Ok(IngestReport {
                processed: 0,
                skipped: 0,
                files,
                status,
                committed: false,
            });
        }

        let mut working = self.data.clone();
        let mut processed = 0;
        let mut skipped = 0;
        for file in &parsed {
            match self.process_file(file, &mut working, today) {
                Ok(report) => {
                    processed += report.processed;
                    skipped += report.skipped;
                    files.push(report);
                }
                Err(e) => return Err(self.abort(e)),
            }
        }

        dedupe_dataset(&mut working, self.config.dedup_threshold);
        reconcile(&mut working, self.config.dedup_threshold);
        if let Err(e) = verify_invariants(&working) {
            return Err(self.abort(e));
        }

        if let Err(e) = self.commit(working) {
            tracing::error!("Failed to persist ingested data: {}", e);
            self.status = SAVE_ERROR_STATUS.to_string();
            return Err(e);
        }

        self.status = format!(
            "Successfully processed {} records ({} rows skipped)",
            processed, skipped
        );
        tracing::info!(
            "{} ({} LLCs, {} clients, {} properties)",
            self.status,
            self.data.llcs.len(),
            self.data.clients.len(),
            self.data.properties.len()
        );
        Ok(IngestReport {
            processed,
            skipped,
            files,
            status: self.status.clone(),
            committed: true,
        })
    }

    fn process_file(
        &self,
        file: &ParsedFile,
        working: &mut Dataset,
        today: NaiveDate,
    ) -> Result<FileReport, CreTrackerError> {
        let ctx = RowContext {
            config: &self.config,
            today,
            source: &file.name,
        };
        let mut processed = 0;
        let mut skipped = 0;
        for (idx, row) in file.rows.iter().enumerate() {
            match process_row(file.kind, row, working, &ctx)? {
                RowOutcome::Processed => processed += 1,
                RowOutcome::Skipped(reason) => {
                    tracing::debug!("{} row {}: skipped, {}", file.name, idx + 2, reason);
                    skipped += 1;
                }
            }
        }
        tracing::info!(
            "{} ({} file): {} processed, {} skipped",
            file.name,
            file.kind,
            processed,
            skipped
        );
        Ok(FileReport {
            name: file.name.clone(),
            kind: Some(file.kind),
            processed,
            skipped,
            error: None,
        })
    }

    fn abort(&mut self, e: CreTrackerError) -> CreTrackerError {
        tracing::error!("Ingestion aborted: {}", e);
        self.status = PROCESSING_ERROR_STATUS.to_string();
        e
    }

    /// Persist first, then swap in the new state, so a failed write leaves
    /// memory and store in agreement.
    fn commit(&mut self, data: Dataset) -> Result<(), CreTrackerError> {
        let llcs = serde_json::to_string(&data.llcs)?;
        let clients = serde_json::to_string(&data.clients)?;
        let properties = serde_json::to_string(&data.properties)?;
        self.store.save_many(&[
            (LLCS_KEY, llcs.as_str()),
            (CLIENTS_KEY, clients.as_str()),
            (PROPERTIES_KEY, properties.as_str()),
        ])?;
        self.data = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
    }

    fn tracker() -> Tracker<MemoryStore> {
        Tracker::open(MemoryStore::new(), TrackerConfig::default()).unwrap()
    }

    #[test]
    fn decode_strips_utf8_bom() {
        let text = decode_upload("a.csv", b"\xEF\xBB\xBFcompany_key,name\n").unwrap();
        assert_eq!(text, "company_key,name\n");
    }

    #[test]
    fn decode_utf16_le() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "owner,address\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_upload("a.csv", &bytes).unwrap(), "owner,address\n");
    }

    #[test]
    fn decode_utf16_be() {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "owner\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_upload("a.csv", &bytes).unwrap(), "owner\n");
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let err = decode_upload("a.csv", &[0x61, 0xFF, 0x62]).unwrap_err();
        assert!(matches!(err, FileError::Unreadable { .. }));
    }

    #[test]
    fn validate_rejects_extension_size_and_empty() {
        assert!(matches!(
            validate_upload(&Upload::new("data.xlsx", "a"), 10),
            Err(FileError::WrongExtension { .. })
        ));
        assert!(matches!(
            validate_upload(&Upload::new("data.csv", "0123456789ab"), 10),
            Err(FileError::TooLarge { size: 12, max: 10, .. })
        ));
        assert!(matches!(
            validate_upload(&Upload::new("data.csv", ""), 10),
            Err(FileError::Empty { .. })
        ));
        validate_upload(&Upload::new("DATA.CSV", "a"), 10).unwrap();
    }

    #[test]
    fn parse_normalizes_headers_and_classifies() {
        let upload = Upload::new(
            "companies.csv",
            "Company Key,\"Company Name\",Phone\n1,\"Acme LLC\",615-111-2222\n",
        );
        let parsed = parse_upload(&upload).unwrap();
        assert_eq!(parsed.kind, SchemaKind::Company);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].get("companyname"), Some("Acme LLC"));
    }

    #[test]
    fn parse_tolerates_ragged_rows() {
        let upload = Upload::new("p.csv", "address,owner,city\n1 Main St,Acme LLC\nx,y,z,extra\n");
        let parsed = parse_upload(&upload).unwrap();
        assert_eq!(parsed.kind, SchemaKind::Property);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].get("city"), None);
        assert_eq!(parsed.rows[1].get("city"), Some("z"));
    }

    #[test]
    fn parse_whitespace_only_is_empty() {
        let err = parse_upload(&Upload::new("p.csv", "  \n\n")).unwrap_err();
        assert!(matches!(err, FileError::Empty { .. }));
    }

    #[test]
    fn header_only_file_processes_nothing() {
        let mut t = tracker();
        let report = t
            .ingest_file(Upload::new("p.csv", "address,owner\n"), today())
            .unwrap();
        assert!(report.committed);
        assert_eq!(report.processed, 0);
        assert_eq!(t.status(), "Successfully processed 0 records (0 rows skipped)");
    }

    #[test]
    fn status_reports_counts() {
        let mut t = tracker();
        let csv = "address,owner\n1 Main St,Acme LLC\n,Nobody\n2 Main St,Acme LLC\n";
        let report = t.ingest_file(Upload::new("p.csv", csv), today()).unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(t.status(), "Successfully processed 2 records (1 rows skipped)");
        assert_eq!(t.llcs().len(), 1);
        assert_eq!(t.clients().len(), 1);
        assert_eq!(t.clients()[0].property_ids, vec![1, 2]);
    }

    #[test]
    fn rejected_single_file_leaves_state_and_sets_status() {
        let mut t = tracker();
        t.ingest_file(Upload::new("p.csv", "address,owner\n1 Main St,Acme LLC\n"), today())
            .unwrap();
        let before = t.dataset().clone();
        let report = t.ingest_file(Upload::new("p.txt", "x"), today()).unwrap();
        assert!(!report.committed);
        assert_eq!(t.dataset(), &before);
        assert!(t.status().contains("valid CSV"));
    }

    #[test]
    fn bad_file_does_not_block_batch() {
        let mut t = tracker();
        let report = t
            .ingest_batch(
                vec![
                    Ok(Upload::new("empty.csv", "")),
                    Ok(Upload::new("p.csv", "address,owner\n1 Main St,Acme LLC\n")),
                ],
                today(),
            )
            .unwrap();
        assert!(report.committed);
        assert_eq!(report.files.len(), 2);
        assert!(report.files[0].error.is_some());
        assert_eq!(report.files[1].processed, 1);
        assert_eq!(t.properties().len(), 1);
    }

    #[test]
    fn commit_persists_all_collections() {
        let mut t = tracker();
        t.ingest_file(Upload::new("p.csv", "address,owner\n1 Main St,Acme LLC\n"), today())
            .unwrap();
        let llcs: Vec<Llc> = load_collection(t.store(), LLCS_KEY).unwrap();
        let clients: Vec<Client> = load_collection(t.store(), CLIENTS_KEY).unwrap();
        let props: Vec<Property> = load_collection(t.store(), PROPERTIES_KEY).unwrap();
        assert_eq!(llcs.len(), 1);
        assert_eq!(clients.len(), 1);
        assert_eq!(props.len(), 1);
    }

    #[tokio::test]
    async fn read_uploads_preserves_order_and_reports_errors() {
        let dir = std::env::temp_dir().join(format!("cretrack-read-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let a = dir.join("a.csv");
        let b = dir.join("b.txt");
        let c = dir.join("missing.csv");
        tokio::fs::write(&a, "owner,address\n").await.unwrap();
        tokio::fs::write(&b, "owner,address\n").await.unwrap();

        let results = read_uploads(&[a, b, c], 1024).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, "a.csv");
        assert!(matches!(results[1], Err(FileError::WrongExtension { .. })));
        assert!(matches!(results[2], Err(FileError::Unreadable { .. })));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}

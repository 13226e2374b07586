//! End-to-end ingestion tests driving the Tracker against both blob stores.

use std::collections::HashSet;

use chrono::NaiveDate;
use cretrack_lib::reconcile::verify_invariants;
use cretrack_lib::{
    BlobStore, CreTrackerError, Db, FileError, MemoryStore, Tracker, TrackerConfig, Upload,
    PROCESSING_ERROR_STATUS,
};

const COMPANIES: &str = "\
Company_Key,Company,Phone,Email,Contact Name
C1,Acme LLC,615-111-2222,,Jane Doe
C2,Broadway Holdings LLC,(615) 555-0123,sarah@broadway.com,Sarah Johnson
C3,Broadway Holding LLC,,ops@broadway.com,
";

const PROPERTIES: &str = "\
Address,Owner,City,Property Type,Sq Ft,MLS Status
1 Acme Way,Acme LLC,,Office,12000,Active
200 Church St,Broadway Holdings LLC,,Retail,8000,Sold
300 Demonbreun St,Gulch Partners,Nashville,Mixed Use,,
,Missing Address LLC,,,,
";

const CONTACTS: &str = "\
Contact_Key,First Name,Last Name,Company,Email,Phone
K1,Maria,Lopez,Gulch Partners,maria@gulch.com,615-777-0000
K2,Solo,Person,,solo@example.com,
";

const PROJECTS: &str = "\
Project_Key,Project Name,Client Company,Contact Name,Phone,Listing Name,City
P1,Gulch Tower,Gulch Partners,Tom Reed,615-999-1111,Gulch Tower Lot,Nashville
";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
}

fn memory_tracker() -> Tracker<MemoryStore> {
    Tracker::open(MemoryStore::new(), TrackerConfig::default()).expect("open tracker")
}

fn batch(files: &[(&str, &str)]) -> Vec<Result<Upload, FileError>> {
    files
        .iter()
        .map(|(name, body)| Ok(Upload::new(*name, body.as_bytes())))
        .collect()
}

#[test]
fn acme_scenario() {
    let mut t = memory_tracker();
    let report = t
        .ingest_batch(
            batch(&[
                ("a.csv", "Company_Key,Company,Phone\n1,Acme LLC,615-111-2222\n"),
                ("b.csv", "Address,Owner\n1 Acme Way,Acme LLC\n"),
            ]),
            today(),
        )
        .unwrap();
    assert!(report.committed);
    assert_eq!(report.processed, 2);

    assert_eq!(t.llcs().len(), 1);
    let llc = &t.llcs()[0];
    assert_eq!(llc.name, "Acme LLC");
    assert_eq!(llc.phone, "615-111-2222");

    assert_eq!(t.properties().len(), 1);
    let property = &t.properties()[0];
    assert_eq!(property.address, "1 Acme Way, Nashville, TN");
    assert_eq!(property.llc_id, llc.id);

    assert_eq!(t.clients().len(), 1);
    let client = &t.clients()[0];
    assert_eq!(client.llc_id, llc.id);
    assert_eq!(client.property_ids, vec![property.id]);
}

#[test]
fn full_batch_keeps_invariants() {
    let mut t = memory_tracker();
    let report = t
        .ingest_batch(
            batch(&[
                ("companies.csv", COMPANIES),
                ("properties.csv", PROPERTIES),
                ("contacts.csv", CONTACTS),
                ("projects.csv", PROJECTS),
            ]),
            today(),
        )
        .unwrap();
    assert!(report.committed);
    assert_eq!(report.skipped, 1);
    verify_invariants(t.dataset()).unwrap();

    // The two Broadway spellings collapse into the first-seen record.
    let names: Vec<&str> = t.llcs().iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Acme LLC", "Broadway Holdings LLC", "Gulch Partners"]);
    let broadway = &t.llcs()[1];
    assert_eq!(broadway.email, "sarah@broadway.com");

    // Project rows overwrite the LLC contact fields unconditionally.
    let gulch = &t.llcs()[2];
    assert_eq!(gulch.contact, "Tom Reed");
    assert_eq!(gulch.phone, "615-999-1111");
    assert_eq!(gulch.email, "maria@gulch.com");

    let listing = t
        .properties()
        .iter()
        .find(|p| p.address == "Gulch Tower Lot, Nashville")
        .expect("listing property");
    assert_eq!(listing.llc_id, gulch.id);

    let statuses: Vec<&str> = t.properties().iter().map(|p| p.status.as_str()).collect();
    assert_eq!(statuses[0], "Available");
    assert_eq!(statuses[1], "Sold");
    assert_eq!(statuses[2], "");
}

#[test]
fn every_llc_has_a_client_with_exact_properties() {
    let mut t = memory_tracker();
    t.ingest_file(Upload::new("properties.csv", PROPERTIES), today())
        .unwrap();
    for llc in t.llcs() {
        let expected: HashSet<i64> = t
            .properties()
            .iter()
            .filter(|p| p.llc_id == llc.id)
            .map(|p| p.id)
            .collect();
        let clients: Vec<_> = t.clients().iter().filter(|c| c.llc_id == llc.id).collect();
        assert!(!clients.is_empty(), "LLC {} has no client", llc.name);
        for client in clients {
            let listed: HashSet<i64> = client.property_ids.iter().copied().collect();
            assert_eq!(listed, expected);
        }
    }
}

#[test]
fn reingesting_each_file_kind_keeps_llcs_and_clients_stable() {
    // Rows each repeat import adds to the property collection.
    let cases = [
        ("companies.csv", COMPANIES, 0),
        ("properties.csv", PROPERTIES, 3),
        ("contacts.csv", CONTACTS, 0),
        ("projects.csv", PROJECTS, 1),
    ];
    for (name, body, appended) in cases {
        let mut t = memory_tracker();
        t.ingest_file(Upload::new(name, body), today()).unwrap();
        let (llcs, clients, properties) =
            (t.llcs().len(), t.clients().len(), t.properties().len());

        t.ingest_file(Upload::new(name, body), today()).unwrap();
        assert_eq!(t.llcs().len(), llcs, "{name}");
        assert_eq!(t.clients().len(), clients, "{name}");
        // Properties are never deduplicated, so a repeat import appends them again.
        assert_eq!(t.properties().len(), properties + appended, "{name}");
        verify_invariants(t.dataset()).unwrap();
    }
}

#[test]
fn blank_phone_never_overwrites() {
    let mut t = memory_tracker();
    t.ingest_file(
        Upload::new("a.csv", "Company_Key,Company,Phone\n1,Acme LLC,615-555-0100\n"),
        today(),
    )
    .unwrap();
    t.ingest_file(
        Upload::new("b.csv", "Company_Key,Company,Phone\n1,Acme LLC,\n"),
        today(),
    )
    .unwrap();
    assert_eq!(t.llcs()[0].phone, "615-555-0100");

    // Backfill path: an existing phone is kept even when the row has another.
    t.ingest_file(
        Upload::new("c.csv", "Address,Owner,Phone\n9 Elm St,Acme LLC,615-555-9999\n"),
        today(),
    )
    .unwrap();
    assert_eq!(t.llcs()[0].phone, "615-555-0100");

    // Project rows overwrite unconditionally.
    t.ingest_file(
        Upload::new("d.csv", "Project_Key,Client Company,Phone\n1,Acme LLC,615-555-9999\n"),
        today(),
    )
    .unwrap();
    assert_eq!(t.llcs()[0].phone, "615-555-9999");
}

#[test]
fn address_normalization() {
    let mut t = memory_tracker();
    t.ingest_file(
        Upload::new(
            "p.csv",
            "Address,Owner,City\n100 Main St,Acme LLC,Franklin\n\"100 Main St, Nashville, TN\",Acme LLC,\n",
        ),
        today(),
    )
    .unwrap();
    let addresses: Vec<&str> = t.properties().iter().map(|p| p.address.as_str()).collect();
    assert_eq!(
        addresses,
        vec!["100 Main St, Franklin, TN", "100 Main St, Nashville, TN"]
    );
}

#[test]
fn company_clients_get_follow_up_dates() {
    let mut t = memory_tracker();
    t.ingest_file(Upload::new("companies.csv", COMPANIES), today())
        .unwrap();
    let client = &t.clients()[0];
    assert_eq!(client.last_contact, "2025-05-20");
    assert_eq!(client.next_follow_up, "2025-05-27");
}

#[test]
fn rejected_files_leave_state_unchanged() {
    let mut t = memory_tracker();
    t.ingest_file(Upload::new("companies.csv", COMPANIES), today())
        .unwrap();
    let before = t.dataset().clone();

    let config = TrackerConfig::default();
    let oversized = vec![b'a'; config.max_upload_bytes as usize + 1];
    let report = t
        .ingest_batch(
            vec![
                Ok(Upload::new("notes.txt", "Company_Key\n1\n")),
                Ok(Upload::new("big.csv", oversized)),
                Ok(Upload::new("empty.csv", "")),
            ],
            today(),
        )
        .unwrap();
    assert!(!report.committed);
    assert_eq!(report.files.len(), 3);
    assert!(report.files.iter().all(|f| f.error.is_some()));
    assert_eq!(t.dataset(), &before);
}

#[test]
fn pipeline_fault_aborts_whole_batch() {
    let store = MemoryStore::new();
    {
        let mut t = Tracker::open(&store, TrackerConfig::default()).unwrap();
        t.ingest_file(Upload::new("companies.csv", COMPANIES), today())
            .unwrap();
    }
    let stored = |key: &str| store.load(key).unwrap();
    let blobs_before = (stored("llcs"), stored("clients"), stored("properties"));

    // Built directly so the out-of-range value skips config validation.
    let config = TrackerConfig {
        follow_up_days: i64::MAX / 1000,
        ..TrackerConfig::default()
    };
    let mut t = Tracker::open(&store, config).unwrap();
    let before = t.dataset().clone();
    let err = t
        .ingest_batch(
            batch(&[
                ("properties.csv", PROPERTIES),
                ("companies.csv", "Company_Key,Company\nZ1,Zeta Partners\n"),
            ]),
            today(),
        )
        .unwrap_err();

    assert!(matches!(err, CreTrackerError::Pipeline(_)));
    assert_eq!(t.status(), PROCESSING_ERROR_STATUS);
    assert_eq!(t.dataset(), &before);
    assert_eq!(
        (stored("llcs"), stored("clients"), stored("properties")),
        blobs_before
    );
}

#[test]
fn idless_stored_llcs_do_not_block_ingestion() {
    let store = MemoryStore::new();
    store
        .save("llcs", r#"[{"name":"Acme LLC"},{"name":"Music City Properties"}]"#)
        .unwrap();
    let mut t = Tracker::open(&store, TrackerConfig::default()).unwrap();
    let ids: Vec<i64> = t.llcs().iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![1, 2]);
    verify_invariants(t.dataset()).unwrap();

    for n in 1..=3 {
        let body = format!("Address,Owner\n{} Acme Way,Acme LLC\n", n);
        let report = t
            .ingest_file(Upload::new("p.csv", body.into_bytes()), today())
            .unwrap();
        assert!(report.committed);
    }
    assert_eq!(t.llcs().len(), 2);
    assert_eq!(t.properties().len(), 3);
    assert!(t.properties().iter().all(|p| p.llc_id == 1));
}

#[test]
fn orphaned_client_is_not_inherited_by_new_llc() {
    let store = MemoryStore::new();
    store.save("llcs", "{corrupt").unwrap();
    store
        .save("clients", r#"[{"id":1,"name":"Acme LLC","llcId":1}]"#)
        .unwrap();
    let mut t = Tracker::open(&store, TrackerConfig::default()).unwrap();
    assert!(t.clients().is_empty());

    t.ingest_file(
        Upload::new("p.csv", "Address,Owner\n1 Main St,Other LLC\n"),
        today(),
    )
    .unwrap();
    assert_eq!(t.llcs().len(), 1);
    assert_eq!(t.llcs()[0].name, "Other LLC");
    assert_eq!(t.clients().len(), 1);
    let client = &t.clients()[0];
    assert_eq!(client.name, "Other LLC");
    assert_eq!(client.llc_id, t.llcs()[0].id);
    assert_eq!(client.property_ids, vec![t.properties()[0].id]);
}

#[test]
fn load_dedupes_stored_duplicates() {
    let store = MemoryStore::new();
    {
        let mut t = Tracker::open(&store, TrackerConfig::default()).unwrap();
        t.ingest_file(Upload::new("companies.csv", COMPANIES), today())
            .unwrap();
    }
    store
        .save(
            "llcs",
            r#"[{"id":1,"name":"Acme LLC"},{"id":2,"name":"Acme, LLC","phone":"615"}]"#,
        )
        .unwrap();
    let t = Tracker::open(&store, TrackerConfig::default()).unwrap();
    assert_eq!(t.llcs().len(), 1);
    assert_eq!(t.llcs()[0].phone, "615");
}

#[test]
fn sqlite_round_trip() {
    let path = std::env::temp_dir().join(format!("cretrack-it-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
        let db = Db::open(&path).unwrap();
        db.init().unwrap();
        let mut t = Tracker::open(db, TrackerConfig::default()).unwrap();
        t.ingest_batch(
            batch(&[("companies.csv", COMPANIES), ("properties.csv", PROPERTIES)]),
            today(),
        )
        .unwrap();
    }

    let db = Db::open(&path).unwrap();
    db.init().unwrap();
    let t = Tracker::open(db, TrackerConfig::default()).unwrap();
    assert_eq!(t.llcs().len(), 3);
    assert_eq!(t.properties().len(), 3);
    verify_invariants(t.dataset()).unwrap();

    drop(t);
    let _ = std::fs::remove_file(&path);
}

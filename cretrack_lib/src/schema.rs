//! Per-file schema sniffing from the header row.

use std::fmt;

use serde::Serialize;

use crate::normalize::normalize_header;

/// Marker column identifying a company export.
pub const COMPANY_MARKER: &str = "company_key";
/// Marker column identifying a contact export.
pub const CONTACT_MARKER: &str = "contact_key";
/// Marker column identifying a project export.
pub const PROJECT_MARKER: &str = "project_key";

/// The record kind carried by one uploaded file.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Company,
    Contact,
    Project,
    Property,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Company => "company",
            Self::Contact => "contact",
            Self::Project => "project",
            Self::Property => "property",
        };
        f.write_str(s)
    }
}

/// Classify a file from its normalized headers.
///
/// Markers are checked in priority order company > contact > project; a file
/// carrying none of them is a property file.
pub fn classify<S: AsRef<str>>(normalized_headers: &[S]) -> SchemaKind {
    let has = |marker: &str| {
        let wanted = normalize_header(marker);
        normalized_headers.iter().any(|h| h.as_ref() == wanted)
    };

    if has(COMPANY_MARKER) {
        SchemaKind::Company
    } else if has(CONTACT_MARKER) {
        SchemaKind::Contact
    } else if has(PROJECT_MARKER) {
        SchemaKind::Project
    } else {
        SchemaKind::Property
    }
}

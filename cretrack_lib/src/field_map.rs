//! Header dictionaries mapping the many spellings found in real exports onto
//! canonical model fields.
//!
//! Two lookup styles are provided. Identity fields (address, owner, company
//! name, phone) use an explicit precedence list where the first non-empty
//! column wins. Descriptive fields are bulk-mapped through a dictionary in
//! column order, so a later non-empty column overwrites an earlier one.

use crate::normalize::{clean_cell, normalize_header};

/// One cleaned CSV row keyed by normalized header, in original column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    /// Build a row from normalized headers and the raw record values.
    ///
    /// Ragged records are tolerated: missing trailing cells read as blank and
    /// surplus cells without a header are dropped.
    pub fn from_record<'a, I>(normalized_headers: &[String], values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut values = values.into_iter();
        let cells = normalized_headers
            .iter()
            .map(|h| (h.clone(), values.next().map(clean_cell).unwrap_or_default()))
            .collect();
        Self { cells }
    }

    /// Build a row from `(header, value)` pairs, normalizing and cleaning both.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let cells = pairs
            .into_iter()
            .map(|(h, v)| (normalize_header(&clean_cell(h)), clean_cell(v)))
            .collect();
        Self { cells }
    }

    /// First non-empty value under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, v)| h == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value among `keys`, searched in precedence order.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Same as [`Row::first_of`] but blank when nothing matches.
    pub fn text(&self, keys: &[&str]) -> String {
        self.first_of(keys).unwrap_or_default().to_string()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    /// True when every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_empty())
    }
}

/// Set `target` to `value` only when the value is present and non-empty.
pub fn assign_if_valid(target: &mut String, value: Option<&str>) {
    if let Some(v) = value {
        if !v.is_empty() {
            *target = v.to_string();
        }
    }
}

// -- Precedence lists for identity fields --

pub const COMPANY_NAME_KEYS: &[&str] = &["companyname", "company", "accountname", "name"];
pub const CONTACT_COMPANY_KEYS: &[&str] = &["companyname", "company", "accountname", "organization"];
pub const OWNER_KEYS: &[&str] = &["owner", "ownername", "llc", "llcname", "ownercompany"];
pub const ADDRESS_KEYS: &[&str] = &["address", "situsaddress", "propertyaddress", "streetaddress"];
pub const PROPERTY_NAME_KEYS: &[&str] = &["propertyname"];
pub const CITY_KEYS: &[&str] = &["city", "situscity", "propertycity"];
pub const STATE_KEYS: &[&str] = &["state", "situsstate", "propertystate"];
pub const PHONE_KEYS: &[&str] = &[
    "phone",
    "phonenumber",
    "companyphone",
    "mainphone",
    "officephone",
    "cellphonenumber",
    "cellphone",
    "cell",
    "mobile",
];
pub const EMAIL_KEYS: &[&str] = &["email", "emailaddress", "companyemail"];
pub const CONTACT_NAME_KEYS: &[&str] = &["contactname", "contact", "primarycontact"];
pub const OWNER_CONTACT_KEYS: &[&str] = &["ownercontact", "contactname", "contact"];
pub const OWNER_PHONE_KEYS: &[&str] = &["ownerphone", "phone", "phonenumber", "cellphonenumber"];
pub const OWNER_EMAIL_KEYS: &[&str] = &["owneremail", "email", "emailaddress"];
pub const PERSON_NAME_KEYS: &[&str] = &["name", "fullname", "contactname"];
pub const FIRST_NAME_KEYS: &[&str] = &["firstname", "first"];
pub const LAST_NAME_KEYS: &[&str] = &["lastname", "last"];
pub const PROJECT_NAME_KEYS: &[&str] = &["projectname", "project", "dealname"];
pub const PROJECT_COMPANY_KEYS: &[&str] = &["clientcompany", "client", "companyname", "company"];
pub const LISTING_KEYS: &[&str] = &["listingname", "listing", "propertyname"];

// -- Property dictionary --

/// Canonical descriptive fields of a property row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyField {
    Value,
    Sqft,
    PropertyType,
    Status,
    MlsStatus,
    RecordingDate,
    Source,
}

pub const PROPERTY_FIELD_DICTIONARY: &[(&str, PropertyField)] = &[
    ("value", PropertyField::Value),
    ("propertyvalue", PropertyField::Value),
    ("price", PropertyField::Value),
    ("listprice", PropertyField::Value),
    ("mlscurrentlistingprice", PropertyField::Value),
    ("dealvalue", PropertyField::Value),
    ("sqft", PropertyField::Sqft),
    ("squarefeet", PropertyField::Sqft),
    ("squarefootage", PropertyField::Sqft),
    ("buildingsquarefootage", PropertyField::Sqft),
    ("buildingsqft", PropertyField::Sqft),
    ("type", PropertyField::PropertyType),
    ("propertytype", PropertyField::PropertyType),
    ("propertyuse", PropertyField::PropertyType),
    ("status", PropertyField::Status),
    ("propertystatus", PropertyField::Status),
    ("projectstatus", PropertyField::Status),
    ("mlsstatus", PropertyField::MlsStatus),
    ("recordingdate", PropertyField::RecordingDate),
    ("source", PropertyField::Source),
];

/// Descriptive property fields collected from one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyDraft {
    pub value: String,
    pub sqft: String,
    pub property_type: String,
    pub status: String,
    pub mls_status: String,
    pub recording_date: String,
    pub source: String,
}

impl PropertyDraft {
    fn slot(&mut self, field: PropertyField) -> &mut String {
        match field {
            PropertyField::Value => &mut self.value,
            PropertyField::Sqft => &mut self.sqft,
            PropertyField::PropertyType => &mut self.property_type,
            PropertyField::Status => &mut self.status,
            PropertyField::MlsStatus => &mut self.mls_status,
            PropertyField::RecordingDate => &mut self.recording_date,
            PropertyField::Source => &mut self.source,
        }
    }

    /// Explicit status, or one derived from MLS data when no status column was filled.
    pub fn resolved_status(&self) -> String {
        if !self.status.is_empty() {
            return self.status.clone();
        }
        if self.mls_status.is_empty() {
            return String::new();
        }
        determine_property_status(&self.mls_status, &self.recording_date).to_string()
    }
}

/// Bulk-map every dictionary header of `row` onto a property draft.
pub fn map_property_fields(row: &Row) -> PropertyDraft {
    let mut draft = PropertyDraft::default();
    for (header, value) in row.cells() {
        if let Some((_, field)) = PROPERTY_FIELD_DICTIONARY.iter().find(|(k, _)| *k == header) {
            assign_if_valid(draft.slot(*field), Some(value));
        }
    }
    draft
}

/// Listing status derived from an MLS status string and the last recording date.
pub fn determine_property_status(mls_status: &str, recording_date: &str) -> &'static str {
    if mls_status.is_empty() {
        return "Off Market";
    }
    let status = mls_status.to_lowercase();
    if status.contains("active") || status.contains("new") {
        "Available"
    } else if status.contains("pending") {
        "Pending"
    } else if status.contains("sold") || !recording_date.is_empty() {
        "Sold"
    } else {
        "Off Market"
    }
}

// -- Client dictionary --

/// Canonical fields of a contact-shaped row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientField {
    Name,
    FirstName,
    LastName,
    Company,
    Email,
    Phone,
}

pub const CLIENT_FIELD_DICTIONARY: &[(&str, ClientField)] = &[
    ("name", ClientField::Name),
    ("fullname", ClientField::Name),
    ("contactname", ClientField::Name),
    ("firstname", ClientField::FirstName),
    ("ownerfirstname", ClientField::FirstName),
    ("lastname", ClientField::LastName),
    ("ownerlastname", ClientField::LastName),
    ("company", ClientField::Company),
    ("companyname", ClientField::Company),
    ("accountname", ClientField::Company),
    ("email", ClientField::Email),
    ("emailaddress", ClientField::Email),
    ("phone", ClientField::Phone),
    ("phonenumber", ClientField::Phone),
    ("cell", ClientField::Phone),
    ("cellphonenumber", ClientField::Phone),
    ("mobile", ClientField::Phone),
];

/// Contact-shaped fields collected from one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientDraft {
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
}

impl ClientDraft {
    fn slot(&mut self, field: ClientField) -> &mut String {
        match field {
            ClientField::Name => &mut self.name,
            ClientField::FirstName => &mut self.first_name,
            ClientField::LastName => &mut self.last_name,
            ClientField::Company => &mut self.company,
            ClientField::Email => &mut self.email,
            ClientField::Phone => &mut self.phone,
        }
    }

    /// The person's display name: an explicit name column, else first + last.
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        [self.first_name.as_str(), self.last_name.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Bulk-map every dictionary header of `row` onto a client draft.
pub fn map_client_fields(row: &Row) -> ClientDraft {
    let mut draft = ClientDraft::default();
    for (header, value) in row.cells() {
        if let Some((_, field)) = CLIENT_FIELD_DICTIONARY.iter().find(|(k, _)| *k == header) {
            assign_if_valid(draft.slot(*field), Some(value));
        }
    }
    draft
}

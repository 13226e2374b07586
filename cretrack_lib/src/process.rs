//! Row processing: turns one cleaned row into create/merge operations on the
//! working collections.
//!
//! Every handler follows the same shape: resolve the identity key, find or
//! create the owning LLC, then find, create or merge the dependent records.
//! A row that lacks its identity fields is skipped with a reason rather than
//! failing the file.

use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::config::TrackerConfig;
use crate::error::CreTrackerError;
use crate::field_map::{
    assign_if_valid, map_client_fields, map_property_fields, Row, ADDRESS_KEYS, CITY_KEYS,
    COMPANY_NAME_KEYS, CONTACT_NAME_KEYS, EMAIL_KEYS, LISTING_KEYS, OWNER_CONTACT_KEYS,
    OWNER_EMAIL_KEYS, OWNER_KEYS, OWNER_PHONE_KEYS, PHONE_KEYS, PROJECT_COMPANY_KEYS,
    PROJECT_NAME_KEYS, PROPERTY_NAME_KEYS, STATE_KEYS,
};
use crate::models::{backfill, next_id, Client, Dataset, Llc, Property};
use crate::normalize::{normalize_name, same_name_ignore_case};
use crate::schema::SchemaKind;

/// Per-file inputs shared by every row of that file.
#[derive(Debug, Clone)]
pub struct RowContext<'a> {
    pub config: &'a TrackerConfig,
    pub today: NaiveDate,
    /// Upload file name, used as the property source when the row names none.
    pub source: &'a str,
}

/// Why a row was not applied.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BlankRow,
    MissingCompanyName,
    InvalidCompanyName,
    MissingAddress,
    MissingOwner,
    MissingContactAndCompany,
    MissingProjectAndCompany,
    UnresolvedProjectOwner,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BlankRow => "blank row",
            Self::MissingCompanyName => "missing company name",
            Self::InvalidCompanyName => "company name failed sanity check",
            Self::MissingAddress => "missing address",
            Self::MissingOwner => "missing owner",
            Self::MissingContactAndCompany => "missing contact and company name",
            Self::MissingProjectAndCompany => "missing project and client company",
            Self::UnresolvedProjectOwner => "listing without a resolvable company",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Processed,
    Skipped(SkipReason),
}

/// Apply one row of a file of the given kind to the working collections.
pub fn process_row(
    kind: SchemaKind,
    row: &Row,
    data: &mut Dataset,
    ctx: &RowContext<'_>,
) -> Result<RowOutcome, CreTrackerError> {
    if row.is_blank() {
        return Ok(RowOutcome::Skipped(SkipReason::BlankRow));
    }
    match kind {
        SchemaKind::Company => process_company_row(row, data, ctx),
        SchemaKind::Contact => Ok(process_contact_row(row, data)),
        SchemaKind::Project => process_project_row(row, data, ctx),
        SchemaKind::Property => process_property_row(row, data, ctx),
    }
}

/// Reject names that are empty, too short, or look like parsing artifacts.
pub fn is_plausible_company_name(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.starts_with('(') || trimmed.starts_with('@') {
        return false;
    }
    normalize_name(trimmed).len() >= 2
}

/// Append the city and state to an address that carries no comma.
pub fn normalize_address(
    address: &str,
    city: Option<&str>,
    state: Option<&str>,
    config: &TrackerConfig,
) -> String {
    if address.contains(',') {
        return address.to_string();
    }
    format!(
        "{}, {}, {}",
        address,
        city.unwrap_or(&config.default_city),
        state.unwrap_or(&config.default_state)
    )
}

fn process_company_row(
    row: &Row,
    data: &mut Dataset,
    ctx: &RowContext<'_>,
) -> Result<RowOutcome, CreTrackerError> {
    let Some(name) = row.first_of(COMPANY_NAME_KEYS) else {
        return Ok(RowOutcome::Skipped(SkipReason::MissingCompanyName));
    };
    if !is_plausible_company_name(name) {
        return Ok(RowOutcome::Skipped(SkipReason::InvalidCompanyName));
    }

    let phone = row.text(PHONE_KEYS);
    let email = row.text(EMAIL_KEYS);
    let contact = row.text(CONTACT_NAME_KEYS);
    let key = normalize_name(name);

    let llc_id = match data.llcs.iter_mut().find(|l| normalize_name(&l.name) == key) {
        Some(llc) => {
            backfill(&mut llc.phone, &phone);
            backfill(&mut llc.email, &email);
            backfill(&mut llc.contact, &contact);
            llc.id
        }
        None => {
            let id = next_id(&data.llcs);
            data.llcs.push(Llc {
                id,
                name: name.to_string(),
                contact: contact.clone(),
                email: email.clone(),
                phone: phone.clone(),
            });
            id
        }
    };

    match data
        .clients
        .iter_mut()
        .find(|c| c.llc_id == llc_id && normalize_name(&c.name) == key)
    {
        Some(client) => {
            backfill(&mut client.phone, &phone);
        }
        None => {
            let follow_up = follow_up_date(ctx.today, ctx.config.follow_up_days)?;
            data.clients.push(Client {
                id: next_id(&data.clients),
                name: name.to_string(),
                contact,
                email,
                phone,
                llc_id,
                property_ids: Vec::new(),
                last_contact: ctx.today.to_string(),
                next_follow_up: follow_up.to_string(),
            });
        }
    }

    Ok(RowOutcome::Processed)
}

/// `today` plus `days`, or a pipeline fault when the date leaves chrono's range.
fn follow_up_date(today: NaiveDate, days: i64) -> Result<NaiveDate, CreTrackerError> {
    Duration::try_days(days)
        .and_then(|d| today.checked_add_signed(d))
        .ok_or_else(|| {
            CreTrackerError::Pipeline(format!("follow-up of {} days is out of range", days))
        })
}

fn process_property_row(
    row: &Row,
    data: &mut Dataset,
    ctx: &RowContext<'_>,
) -> Result<RowOutcome, CreTrackerError> {
    let property_name = row.first_of(PROPERTY_NAME_KEYS);
    let Some(address) = row.first_of(ADDRESS_KEYS).or(property_name) else {
        return Ok(RowOutcome::Skipped(SkipReason::MissingAddress));
    };
    let Some(owner) = row.first_of(OWNER_KEYS).or(property_name) else {
        return Ok(RowOutcome::Skipped(SkipReason::MissingOwner));
    };

    let address = normalize_address(
        address,
        row.first_of(CITY_KEYS),
        row.first_of(STATE_KEYS),
        ctx.config,
    );

    let contact = row.text(OWNER_CONTACT_KEYS);
    let email = row.text(OWNER_EMAIL_KEYS);
    let phone = row.text(OWNER_PHONE_KEYS);

    let llc_id = match data
        .llcs
        .iter_mut()
        .find(|l| same_name_ignore_case(&l.name, owner))
    {
        Some(llc) => {
            backfill(&mut llc.contact, &contact);
            backfill(&mut llc.email, &email);
            backfill(&mut llc.phone, &phone);
            llc.id
        }
        None => {
            let id = next_id(&data.llcs);
            data.llcs.push(Llc {
                id,
                name: owner.to_string(),
                contact,
                email,
                phone,
            });
            id
        }
    };

    push_property(data, llc_id, address, owner.to_string(), row, ctx)?;
    Ok(RowOutcome::Processed)
}

fn process_contact_row(row: &Row, data: &mut Dataset) -> RowOutcome {
    let draft = map_client_fields(row);
    let contact_name = draft.display_name();
    if contact_name.is_empty() && draft.company.is_empty() {
        return RowOutcome::Skipped(SkipReason::MissingContactAndCompany);
    }
    if draft.company.is_empty() {
        return RowOutcome::Processed;
    }

    match data
        .llcs
        .iter_mut()
        .find(|l| same_name_ignore_case(&l.name, &draft.company))
    {
        Some(llc) => {
            if !contact_name.is_empty() {
                llc.contact = contact_name;
            }
            backfill(&mut llc.phone, &draft.phone);
            backfill(&mut llc.email, &draft.email);
        }
        None => {
            let id = next_id(&data.llcs);
            data.llcs.push(Llc {
                id,
                name: draft.company.clone(),
                contact: contact_name,
                email: draft.email.clone(),
                phone: draft.phone.clone(),
            });
        }
    }
    RowOutcome::Processed
}

fn process_project_row(
    row: &Row,
    data: &mut Dataset,
    ctx: &RowContext<'_>,
) -> Result<RowOutcome, CreTrackerError> {
    let project = row.first_of(PROJECT_NAME_KEYS);
    let company = row.first_of(PROJECT_COMPANY_KEYS);
    if project.is_none() && company.is_none() {
        return Ok(RowOutcome::Skipped(SkipReason::MissingProjectAndCompany));
    }

    let contact = row.first_of(CONTACT_NAME_KEYS);
    let email = row.first_of(EMAIL_KEYS);
    let phone = row.first_of(PHONE_KEYS);

    let llc_id = company.map(|company| {
        match data
            .llcs
            .iter_mut()
            .find(|l| same_name_ignore_case(&l.name, company))
        {
            Some(llc) => {
                assign_if_valid(&mut llc.contact, contact);
                assign_if_valid(&mut llc.email, email);
                assign_if_valid(&mut llc.phone, phone);
                llc.id
            }
            None => {
                let id = next_id(&data.llcs);
                data.llcs.push(Llc {
                    id,
                    name: company.to_string(),
                    contact: contact.unwrap_or_default().to_string(),
                    email: email.unwrap_or_default().to_string(),
                    phone: phone.unwrap_or_default().to_string(),
                });
                id
            }
        }
    });

    let Some(listing) = row.first_of(LISTING_KEYS) else {
        return Ok(RowOutcome::Processed);
    };
    let Some(llc_id) = llc_id else {
        return Ok(RowOutcome::Skipped(SkipReason::UnresolvedProjectOwner));
    };

    let address = match row.first_of(CITY_KEYS) {
        Some(city) => format!("{}, {}", listing, city),
        None => listing.to_string(),
    };
    let owner = data
        .llc(llc_id)
        .map(|l| l.name.clone())
        .unwrap_or_default();
    push_property(data, llc_id, address, owner, row, ctx)?;
    Ok(RowOutcome::Processed)
}

fn push_property(
    data: &mut Dataset,
    llc_id: i64,
    address: String,
    owner: String,
    row: &Row,
    ctx: &RowContext<'_>,
) -> Result<(), CreTrackerError> {
    if data.llc(llc_id).is_none() {
        return Err(CreTrackerError::Pipeline(format!(
            "LLC {} does not exist for new property at {}",
            llc_id, address
        )));
    }

    let draft = map_property_fields(row);
    let status = draft.resolved_status();
    let source = if draft.source.is_empty() {
        ctx.source.to_string()
    } else {
        draft.source
    };
    data.properties.push(Property {
        id: next_id(&data.properties),
        address,
        owner,
        value: draft.value,
        sqft: draft.sqft,
        property_type: draft.property_type,
        status,
        source,
        llc_id,
    });
    Ok(())
}

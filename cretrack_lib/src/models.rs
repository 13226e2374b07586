//! Relational model: LLCs own Properties, and each LLC is represented by a Client.
//!
//! Field names serialize in camelCase so blobs written by earlier versions of
//! the dashboard load without conversion. Every field defaults, which lets a
//! partially-populated blob deserialize instead of being discarded.

use serde::{Deserialize, Serialize};

/// A property-owning legal entity.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Llc {
    pub id: i64,
    pub name: String,
    pub contact: String,
    pub email: String,
    pub phone: String,
}

/// The contactable representative of an LLC.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub contact: String,
    pub email: String,
    pub phone: String,
    pub llc_id: i64,
    /// Derived from the property collection during reconciliation.
    pub property_ids: Vec<i64>,
    pub last_contact: String,
    pub next_follow_up: String,
}

/// A single tracked property.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Property {
    pub id: i64,
    pub address: String,
    /// Display name of the owner at import time.
    pub owner: String,
    pub value: String,
    pub sqft: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub status: String,
    pub source: String,
    pub llc_id: i64,
}

/// The three collections as one unit of state.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub llcs: Vec<Llc>,
    pub clients: Vec<Client>,
    pub properties: Vec<Property>,
}

/// Anything with a synthetic integer id.
pub trait Identified {
    fn id(&self) -> i64;
    fn id_mut(&mut self) -> &mut i64;
}

impl Identified for Llc {
    fn id(&self) -> i64 {
        self.id
    }

    fn id_mut(&mut self) -> &mut i64 {
        &mut self.id
    }
}

impl Identified for Client {
    fn id(&self) -> i64 {
        self.id
    }

    fn id_mut(&mut self) -> &mut i64 {
        &mut self.id
    }
}

impl Identified for Property {
    fn id(&self) -> i64 {
        self.id
    }

    fn id_mut(&mut self) -> &mut i64 {
        &mut self.id
    }
}

/// Next free id for a collection: one past the current maximum, or 1 when empty.
pub fn next_id<T: Identified>(items: &[T]) -> i64 {
    items.iter().map(Identified::id).max().map_or(1, |max| max + 1)
}

/// Write `value` into `slot` only when the slot is currently blank.
///
/// Returns true when the slot changed.
pub fn backfill(slot: &mut String, value: &str) -> bool {
    if slot.is_empty() && !value.is_empty() {
        *slot = value.to_string();
        true
    } else {
        false
    }
}

impl Llc {
    /// Fill blank contact fields from a near-duplicate record.
    pub fn absorb(&mut self, other: &Llc) {
        backfill(&mut self.contact, &other.contact);
        backfill(&mut self.email, &other.email);
        backfill(&mut self.phone, &other.phone);
    }
}

impl Client {
    /// Fill blank fields from a near-duplicate record.
    pub fn absorb(&mut self, other: &Client) {
        backfill(&mut self.contact, &other.contact);
        backfill(&mut self.email, &other.email);
        backfill(&mut self.phone, &other.phone);
        backfill(&mut self.last_contact, &other.last_contact);
        backfill(&mut self.next_follow_up, &other.next_follow_up);
    }
}

impl Dataset {
    pub fn llc(&self, id: i64) -> Option<&Llc> {
        self.llcs.iter().find(|l| l.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.llcs.is_empty() && self.clients.is_empty() && self.properties.is_empty()
    }
}

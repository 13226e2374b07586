//! Post-pass that restores the cross-reference invariants between LLCs,
//! Clients and Properties.

use std::collections::{HashMap, HashSet};

use crate::dedup::{apply_llc_remap, dedupe_clients};
use crate::error::CreTrackerError;
use crate::models::{next_id, Client, Dataset, Identified, Llc};
use crate::normalize::normalize_name;

/// Give every record a positive id unique within its collection, handing out
/// fresh ids from `next` upward. Returns old id -> new id for the first holder
/// of each non-positive id so references to it can follow.
fn reassign_ids<T: Identified>(
    items: &mut [T],
    mut next: i64,
    repairs: &mut usize,
) -> HashMap<i64, i64> {
    let mut seen = HashSet::new();
    let mut remap = HashMap::new();
    for item in items.iter_mut() {
        let old = item.id();
        if old > 0 && seen.insert(old) {
            continue;
        }
        *item.id_mut() = next;
        seen.insert(next);
        if old <= 0 {
            remap.entry(old).or_insert(next);
        }
        next += 1;
        *repairs += 1;
    }
    remap
}

/// Restore id uniqueness and foreign keys on data loaded from storage.
///
/// Missing and repeated ids are replaced with fresh ones that no stored
/// reference points at. A Property whose LLC is gone moves to the LLC named by
/// its `owner` (created when none exists) and is dropped when no owner is
/// recorded. A Client whose LLC is gone moves to an LLC of the same name or is
/// dropped; reconciliation then synthesizes any missing Client.
///
/// Returns the number of records changed or removed.
pub fn repair_dataset(data: &mut Dataset) -> usize {
    let mut repairs = 0;

    let ceiling = data
        .llcs
        .iter()
        .map(|l| l.id)
        .chain(data.clients.iter().map(|c| c.llc_id))
        .chain(data.properties.iter().map(|p| p.llc_id))
        .max()
        .unwrap_or(0)
        .max(0);
    let remap = reassign_ids(&mut data.llcs, ceiling + 1, &mut repairs);
    apply_llc_remap(data, &remap);
    let client_floor = next_id(&data.clients).max(1);
    reassign_ids(&mut data.clients, client_floor, &mut repairs);
    let property_floor = next_id(&data.properties).max(1);
    reassign_ids(&mut data.properties, property_floor, &mut repairs);

    let live: HashSet<i64> = data.llcs.iter().map(|l| l.id).collect();
    let mut next_llc = next_id(&data.llcs).max(ceiling + 1);

    let mut properties = Vec::with_capacity(data.properties.len());
    for mut property in std::mem::take(&mut data.properties) {
        if live.contains(&property.llc_id) {
            properties.push(property);
            continue;
        }
        repairs += 1;
        let key = normalize_name(&property.owner);
        if key.is_empty() {
            tracing::warn!(
                "Dropping property {} ({}): LLC {} is missing and no owner is recorded",
                property.id,
                property.address,
                property.llc_id
            );
            continue;
        }
        property.llc_id = match data.llcs.iter().find(|l| normalize_name(&l.name) == key) {
            Some(llc) => llc.id,
            None => {
                let id = next_llc;
                next_llc += 1;
                data.llcs.push(Llc {
                    id,
                    name: property.owner.clone(),
                    ..Default::default()
                });
                id
            }
        };
        properties.push(property);
    }
    data.properties = properties;

    let mut clients = Vec::with_capacity(data.clients.len());
    for mut client in std::mem::take(&mut data.clients) {
        if live.contains(&client.llc_id) {
            clients.push(client);
            continue;
        }
        repairs += 1;
        let key = normalize_name(&client.name);
        match data.llcs.iter().find(|l| normalize_name(&l.name) == key) {
            Some(llc) => {
                client.llc_id = llc.id;
                clients.push(client);
            }
            None => tracing::warn!(
                "Dropping client {} ({}): LLC {} is missing",
                client.id,
                client.name,
                client.llc_id
            ),
        }
    }
    data.clients = clients;

    repairs
}

/// Give every LLC a Client, recompute every Client's property list from
/// ownership, then re-run client deduplication.
///
/// Never rewrites a Property's `llc_id`. Idempotent on its own output.
pub fn reconcile(data: &mut Dataset, threshold: usize) {
    let represented: HashSet<i64> = data.clients.iter().map(|c| c.llc_id).collect();
    let mut synthesized = 0usize;
    for llc in &data.llcs {
        if represented.contains(&llc.id) {
            continue;
        }
        let client = Client {
            id: next_id(&data.clients),
            name: llc.name.clone(),
            contact: llc.contact.clone(),
            email: llc.email.clone(),
            phone: llc.phone.clone(),
            llc_id: llc.id,
            property_ids: Vec::new(),
            last_contact: String::new(),
            next_follow_up: String::new(),
        };
        data.clients.push(client);
        synthesized += 1;
    }

    let mut owned: HashMap<i64, Vec<i64>> = HashMap::new();
    for property in &data.properties {
        owned.entry(property.llc_id).or_default().push(property.id);
    }
    for client in &mut data.clients {
        client.property_ids = owned.get(&client.llc_id).cloned().unwrap_or_default();
    }

    data.clients = dedupe_clients(&data.clients, threshold);

    if synthesized > 0 {
        tracing::debug!("Reconciliation synthesized {} client(s)", synthesized);
    }
}

/// Check every relational invariant of a committed dataset.
pub fn verify_invariants(data: &Dataset) -> Result<(), CreTrackerError> {
    let fault = |msg: String| Err(CreTrackerError::Pipeline(msg));

    let mut llc_ids = HashSet::new();
    for llc in &data.llcs {
        if !llc_ids.insert(llc.id) {
            return fault(format!("duplicate LLC id {}", llc.id));
        }
    }
    let mut client_ids = HashSet::new();
    for client in &data.clients {
        if !client_ids.insert(client.id) {
            return fault(format!("duplicate client id {}", client.id));
        }
        if !llc_ids.contains(&client.llc_id) {
            return fault(format!(
                "client {} references missing LLC {}",
                client.id, client.llc_id
            ));
        }
    }
    let mut property_ids = HashSet::new();
    let mut owned: HashMap<i64, HashSet<i64>> = HashMap::new();
    for property in &data.properties {
        if !property_ids.insert(property.id) {
            return fault(format!("duplicate property id {}", property.id));
        }
        if !llc_ids.contains(&property.llc_id) {
            return fault(format!(
                "property {} references missing LLC {}",
                property.id, property.llc_id
            ));
        }
        owned.entry(property.llc_id).or_default().insert(property.id);
    }

    let represented: HashSet<i64> = data.clients.iter().map(|c| c.llc_id).collect();
    if let Some(llc) = data.llcs.iter().find(|l| !represented.contains(&l.id)) {
        return fault(format!("LLC {} has no client", llc.id));
    }

    let empty = HashSet::new();
    for client in &data.clients {
        let listed: HashSet<i64> = client.property_ids.iter().copied().collect();
        let expected = owned.get(&client.llc_id).unwrap_or(&empty);
        if listed != *expected || listed.len() != client.property_ids.len() {
            return fault(format!(
                "client {} property list out of sync with LLC {}",
                client.id, client.llc_id
            ));
        }
    }

    Ok(())
}

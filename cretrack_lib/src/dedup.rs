//! Fuzzy deduplication of LLCs and Clients by normalized-name edit distance.
//!
//! Each record is compared only against records already accepted, in input
//! order, and collapses into the first accepted record within the threshold.
//! Matching is therefore not transitive: for A~B and B~C with A and C far
//! apart, B folds into A while C is kept on its own. Blank fields of the
//! survivor are filled from the discarded duplicate.
//!
//! Comparisons are O(n^2) over the working set, which is fine for the
//! hundreds-to-low-thousands of rows these exports carry.

use std::collections::HashMap;

use crate::models::{Client, Dataset, Llc};
use crate::normalize::normalize_name;

/// Default maximum Levenshtein distance between duplicate names.
pub const DEFAULT_THRESHOLD: usize = 3;

/// True when two normalized names are within `threshold` edits of each other.
pub fn is_fuzzy_duplicate(a: &str, b: &str, threshold: usize) -> bool {
    strsim::levenshtein(a, b) <= threshold
}

/// Result of LLC deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlcDedup {
    pub llcs: Vec<Llc>,
    /// Discarded LLC id -> id of the LLC it was folded into.
    pub remap: HashMap<i64, i64>,
}

/// Collapse near-duplicate LLCs, keeping the first-seen record of each group.
pub fn dedupe_llcs(llcs: &[Llc], threshold: usize) -> LlcDedup {
    let mut accepted: Vec<(String, Llc)> = Vec::with_capacity(llcs.len());
    let mut remap = HashMap::new();

    for llc in llcs {
        let key = normalize_name(&llc.name);
        match accepted
            .iter_mut()
            .find(|(k, _)| is_fuzzy_duplicate(k, &key, threshold))
        {
            Some((_, survivor)) => {
                tracing::debug!(
                    "LLC '{}' ({}) folded into '{}' ({})",
                    llc.name,
                    llc.id,
                    survivor.name,
                    survivor.id
                );
                survivor.absorb(llc);
                if llc.id != survivor.id {
                    remap.insert(llc.id, survivor.id);
                }
            }
            None => accepted.push((key, llc.clone())),
        }
    }

    LlcDedup {
        llcs: accepted.into_iter().map(|(_, l)| l).collect(),
        remap,
    }
}

/// Collapse near-duplicate Clients. Two clients are duplicates only when they
/// belong to the same LLC and their names are within the threshold.
pub fn dedupe_clients(clients: &[Client], threshold: usize) -> Vec<Client> {
    let mut accepted: Vec<(String, Client)> = Vec::with_capacity(clients.len());

    for client in clients {
        let key = normalize_name(&client.name);
        match accepted.iter_mut().find(|(k, c)| {
            c.llc_id == client.llc_id && is_fuzzy_duplicate(k, &key, threshold)
        }) {
            Some((_, survivor)) => {
                tracing::debug!(
                    "Client '{}' ({}) folded into '{}' ({})",
                    client.name,
                    client.id,
                    survivor.name,
                    survivor.id
                );
                survivor.absorb(client);
                for id in &client.property_ids {
                    if !survivor.property_ids.contains(id) {
                        survivor.property_ids.push(*id);
                    }
                }
            }
            None => accepted.push((key, client.clone())),
        }
    }

    accepted.into_iter().map(|(_, c)| c).collect()
}

/// Point every Client and Property at the surviving LLC of its group.
pub fn apply_llc_remap(data: &mut Dataset, remap: &HashMap<i64, i64>) {
    if remap.is_empty() {
        return;
    }
    for client in &mut data.clients {
        if let Some(&to) = remap.get(&client.llc_id) {
            client.llc_id = to;
        }
    }
    for property in &mut data.properties {
        if let Some(&to) = remap.get(&property.llc_id) {
            property.llc_id = to;
        }
    }
}

/// Deduplicate LLCs (rewriting foreign keys) and then Clients, in place.
pub fn dedupe_dataset(data: &mut Dataset, threshold: usize) {
    let LlcDedup { llcs, remap } = dedupe_llcs(&data.llcs, threshold);
    data.llcs = llcs;
    apply_llc_remap(data, &remap);
    data.clients = dedupe_clients(&data.clients, threshold);
}

//! Read-side helpers for list views: search, pagination and summary counts.
//!
//! All functions borrow the committed collections and never mutate them.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Client, Dataset, Llc, Property};

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Properties whose address, owning LLC name, type or status contains `query`.
pub fn search_properties<'a>(data: &'a Dataset, query: Option<&str>) -> Vec<&'a Property> {
    let Some(q) = query.map(str::to_lowercase) else {
        return data.properties.iter().collect();
    };
    data.properties
        .iter()
        .filter(|p| {
            let llc_name = data.llc(p.llc_id).map(|l| l.name.as_str()).unwrap_or("");
            contains_ci(&p.address, &q)
                || contains_ci(llc_name, &q)
                || contains_ci(&p.property_type, &q)
                || contains_ci(&p.status, &q)
        })
        .collect()
}

/// Clients whose name, contact, email, phone, or the address or type of any
/// of their properties contains `query`.
pub fn search_clients<'a>(data: &'a Dataset, query: Option<&str>) -> Vec<&'a Client> {
    let Some(q) = query.map(str::to_lowercase) else {
        return data.clients.iter().collect();
    };
    data.clients
        .iter()
        .filter(|c| {
            contains_ci(&c.name, &q)
                || contains_ci(&c.contact, &q)
                || contains_ci(&c.email, &q)
                || contains_ci(&c.phone, &q)
                || data
                    .properties
                    .iter()
                    .filter(|p| c.property_ids.contains(&p.id))
                    .any(|p| {
                        contains_ci(&p.address, &q) || contains_ci(&p.property_type, &q)
                    })
        })
        .collect()
}

/// LLCs whose name, contact, email or phone contains `query`.
pub fn search_llcs<'a>(data: &'a Dataset, query: Option<&str>) -> Vec<&'a Llc> {
    let Some(q) = query.map(str::to_lowercase) else {
        return data.llcs.iter().collect();
    };
    data.llcs
        .iter()
        .filter(|l| {
            contains_ci(&l.name, &q)
                || contains_ci(&l.contact, &q)
                || contains_ci(&l.email, &q)
                || contains_ci(&l.phone, &q)
        })
        .collect()
}

/// One page of a list view.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Slice `items` into the 1-based `page` of `per_page` entries. A page past
/// the end is empty.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let total = items.len();
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total_pages = total.div_ceil(per_page);
    let items = items
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();
    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
    }
}

/// Overview counts for the dashboard.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub llcs: usize,
    pub clients: usize,
    pub properties: usize,
    /// Clients whose next follow-up is on or before today.
    pub follow_ups_due: usize,
}

pub fn summarize(data: &Dataset, today: NaiveDate) -> Summary {
    let follow_ups_due = data
        .clients
        .iter()
        .filter_map(|c| NaiveDate::parse_from_str(&c.next_follow_up, "%Y-%m-%d").ok())
        .filter(|d| *d <= today)
        .count();
    Summary {
        llcs: data.llcs.len(),
        clients: data.clients.len(),
        properties: data.properties.len(),
        follow_ups_due,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset {
            llcs: vec![
                Llc {
                    id: 1,
                    name: "Broadway Holdings LLC".into(),
                    contact: "Sarah Johnson".into(),
                    email: "sarah@broadway.com".into(),
                    phone: "(615) 555-0123".into(),
                },
                Llc {
                    id: 2,
                    name: "Music City Properties".into(),
                    ..Default::default()
                },
            ],
            clients: vec![
                Client {
                    id: 1,
                    name: "Broadway Holdings LLC".into(),
                    contact: "Sarah Johnson".into(),
                    llc_id: 1,
                    property_ids: vec![1],
                    next_follow_up: "2025-05-01".into(),
                    ..Default::default()
                },
                Client {
                    id: 2,
                    name: "Music City Properties".into(),
                    llc_id: 2,
                    property_ids: vec![2],
                    next_follow_up: "2025-06-01".into(),
                    ..Default::default()
                },
            ],
            properties: vec![
                Property {
                    id: 1,
                    address: "123 Broadway, Nashville, TN".into(),
                    property_type: "Retail".into(),
                    status: "Available".into(),
                    llc_id: 1,
                    ..Default::default()
                },
                Property {
                    id: 2,
                    address: "456 Music Row, Nashville, TN".into(),
                    property_type: "Office".into(),
                    status: "Sold".into(),
                    llc_id: 2,
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn no_query_returns_everything() {
        let data = sample();
        assert_eq!(search_properties(&data, None).len(), 2);
        assert_eq!(search_clients(&data, None).len(), 2);
        assert_eq!(search_llcs(&data, None).len(), 2);
    }

    #[test]
    fn property_search_matches_llc_name() {
        let data = sample();
        let hits = search_properties(&data, Some("music city"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn property_search_matches_type_and_status() {
        let data = sample();
        assert_eq!(search_properties(&data, Some("RETAIL"))[0].id, 1);
        assert_eq!(search_properties(&data, Some("sold"))[0].id, 2);
    }

    #[test]
    fn client_search_matches_property_address() {
        let data = sample();
        let hits = search_clients(&data, Some("music row"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn client_search_matches_property_type() {
        let data = sample();
        let hits = search_clients(&data, Some("office"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn llc_search_matches_email() {
        let data = sample();
        let hits = search_llcs(&data, Some("@broadway"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn paginate_splits_pages() {
        let items: Vec<i32> = (1..=25).collect();
        let page = paginate(items.clone(), 3, 10);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        let beyond = paginate(items, 4, 10);
        assert!(beyond.items.is_empty());
    }

    #[test]
    fn paginate_empty() {
        let page = paginate(Vec::<i32>::new(), 1, 10);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn summary_counts_due_follow_ups() {
        let data = sample();
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        let s = summarize(&data, today);
        assert_eq!(s.llcs, 2);
        assert_eq!(s.clients, 2);
        assert_eq!(s.properties, 2);
        assert_eq!(s.follow_ups_due, 1);
    }

    #[test]
    fn blank_follow_up_is_not_due() {
        let mut data = sample();
        data.clients[0].next_follow_up.clear();
        let today = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(summarize(&data, today).follow_ups_due, 1);
    }
}

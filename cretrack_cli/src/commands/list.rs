//! The `llcs`, `clients` and `properties` subcommands.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use cretrack_lib::query::{paginate, search_clients, search_llcs, search_properties};
use cretrack_lib::{validation, TrackerConfig};

use super::open_tracker;
use crate::output::{print_clients, print_llcs, print_properties, OutputFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Llcs,
    Clients,
    Properties,
}

impl Collection {
    fn label(self) -> &'static str {
        match self {
            Collection::Llcs => "LLCs",
            Collection::Clients => "clients",
            Collection::Properties => "properties",
        }
    }
}

#[derive(Args)]
pub struct ListArgs {
    /// Case-insensitive text search
    #[arg(long)]
    pub search: Option<String>,

    /// Page number
    #[arg(long, default_value = "1")]
    pub page: usize,

    /// Results per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,
}

pub fn run(
    collection: Collection,
    args: &ListArgs,
    db_path: &Path,
    config: TrackerConfig,
    format: &OutputFormat,
) -> Result<()> {
    let search = match args.search {
        Some(ref s) => Some(validation::validate_search(s)?),
        None => None,
    };
    let page = validation::validate_page(args.page)?;
    let page_size = validation::validate_page_size(args.page_size.unwrap_or(config.page_size))?;

    let tracker = open_tracker(db_path, config)?;
    let data = tracker.dataset();
    let query = search.as_deref();

    let (page_no, total_pages, total) = match collection {
        Collection::Llcs => {
            let page = paginate(search_llcs(data, query), page, page_size);
            print_llcs(&page.items, data, format)?;
            (page.page, page.total_pages, page.total)
        }
        Collection::Clients => {
            let page = paginate(search_clients(data, query), page, page_size);
            print_clients(&page.items, data, format)?;
            (page.page, page.total_pages, page.total)
        }
        Collection::Properties => {
            let page = paginate(search_properties(data, query), page, page_size);
            print_properties(&page.items, format)?;
            (page.page, page.total_pages, page.total)
        }
    };

    eprintln!(
        "Page {}/{} ({} total {})",
        page_no,
        total_pages,
        total,
        collection.label()
    );

    Ok(())
}

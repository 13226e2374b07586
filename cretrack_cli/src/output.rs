use anyhow::Result;
use cretrack_lib::{Client, Dataset, IngestReport, Llc, Property, Summary};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            "markdown" | "md" => OutputFormat::Markdown,
            _ => OutputFormat::Table,
        }
    }
}

#[derive(Tabled, Serialize)]
struct LlcRow {
    #[tabled(rename = "ID")]
    #[serde(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Contact")]
    #[serde(rename = "Contact")]
    contact: String,
    #[tabled(rename = "Email")]
    #[serde(rename = "Email")]
    email: String,
    #[tabled(rename = "Phone")]
    #[serde(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Properties")]
    #[serde(rename = "Properties")]
    properties: usize,
}

#[derive(Tabled, Serialize)]
struct ClientRow {
    #[tabled(rename = "ID")]
    #[serde(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    #[serde(rename = "Name")]
    name: String,
    #[tabled(rename = "Contact")]
    #[serde(rename = "Contact")]
    contact: String,
    #[tabled(rename = "Phone")]
    #[serde(rename = "Phone")]
    phone: String,
    #[tabled(rename = "LLC")]
    #[serde(rename = "LLC")]
    llc: String,
    #[tabled(rename = "Properties")]
    #[serde(rename = "Properties")]
    properties: usize,
    #[tabled(rename = "Last Contact")]
    #[serde(rename = "Last Contact")]
    last_contact: String,
    #[tabled(rename = "Next Follow-Up")]
    #[serde(rename = "Next Follow-Up")]
    next_follow_up: String,
}

#[derive(Tabled, Serialize)]
struct PropertyRow {
    #[tabled(rename = "ID")]
    #[serde(rename = "ID")]
    id: i64,
    #[tabled(rename = "Address")]
    #[serde(rename = "Address")]
    address: String,
    #[tabled(rename = "Owner")]
    #[serde(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "Type")]
    property_type: String,
    #[tabled(rename = "Sq Ft")]
    #[serde(rename = "Sq Ft")]
    sqft: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
    #[tabled(rename = "Status")]
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Tabled, Serialize)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    #[serde(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Count")]
    #[serde(rename = "Count")]
    count: usize,
}

#[derive(Tabled, Serialize)]
struct FileReportRow {
    #[tabled(rename = "File")]
    #[serde(rename = "File")]
    file: String,
    #[tabled(rename = "Kind")]
    #[serde(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Processed")]
    #[serde(rename = "Processed")]
    processed: usize,
    #[tabled(rename = "Skipped")]
    #[serde(rename = "Skipped")]
    skipped: usize,
    #[tabled(rename = "Error")]
    #[serde(rename = "Error")]
    error: String,
}

// -- Row builders --

fn build_llc_rows(llcs: &[&Llc], data: &Dataset) -> Vec<LlcRow> {
    llcs.iter()
        .map(|l| LlcRow {
            id: l.id,
            name: l.name.clone(),
            contact: l.contact.clone(),
            email: l.email.clone(),
            phone: l.phone.clone(),
            properties: data.properties.iter().filter(|p| p.llc_id == l.id).count(),
        })
        .collect()
}

fn build_client_rows(clients: &[&Client], data: &Dataset) -> Vec<ClientRow> {
    clients
        .iter()
        .map(|c| ClientRow {
            id: c.id,
            name: c.name.clone(),
            contact: c.contact.clone(),
            phone: c.phone.clone(),
            llc: data.llc(c.llc_id).map(|l| l.name.clone()).unwrap_or_default(),
            properties: c.property_ids.len(),
            last_contact: display_or_dash(&c.last_contact),
            next_follow_up: display_or_dash(&c.next_follow_up),
        })
        .collect()
}

fn build_property_rows(properties: &[&Property]) -> Vec<PropertyRow> {
    properties
        .iter()
        .map(|p| PropertyRow {
            id: p.id,
            address: p.address.clone(),
            owner: p.owner.clone(),
            property_type: p.property_type.clone(),
            sqft: p.sqft.clone(),
            value: p.value.clone(),
            status: display_or_dash(&p.status),
        })
        .collect()
}

fn build_summary_rows(summary: &Summary) -> Vec<SummaryRow> {
    vec![
        SummaryRow {
            metric: "LLCs".to_string(),
            count: summary.llcs,
        },
        SummaryRow {
            metric: "Clients".to_string(),
            count: summary.clients,
        },
        SummaryRow {
            metric: "Properties".to_string(),
            count: summary.properties,
        },
        SummaryRow {
            metric: "Follow-ups due".to_string(),
            count: summary.follow_ups_due,
        },
    ]
}

fn build_file_report_rows(report: &IngestReport) -> Vec<FileReportRow> {
    report
        .files
        .iter()
        .map(|f| FileReportRow {
            file: f.name.clone(),
            kind: f.kind.map(|k| k.to_string()).unwrap_or_default(),
            processed: f.processed,
            skipped: f.skipped,
            error: f.error.clone().unwrap_or_default(),
        })
        .collect()
}

fn display_or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Prefix values that spreadsheet apps would evaluate as formulas.
pub fn sanitize_csv_field(value: &str) -> String {
    match value.chars().next() {
        Some('=') | Some('+') | Some('-') | Some('@') => format!("\t{}", value),
        _ => value.to_string(),
    }
}

// -- Generic renderers --

fn print_table<T: Tabled>(rows: Vec<T>) {
    println!("{}", Table::new(rows));
}

fn print_markdown<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    println!("{}", table);
}

fn print_csv<T: Serialize>(rows: Vec<T>) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn render<T: Tabled + Serialize>(rows: Vec<T>, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(rows),
        OutputFormat::Markdown => print_markdown(rows),
        OutputFormat::Csv => print_csv(rows)?,
        OutputFormat::Json => print_json(&rows),
    }
    Ok(())
}

// -- Public print functions --

pub fn print_llcs(llcs: &[&Llc], data: &Dataset, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&llcs);
            Ok(())
        }
        OutputFormat::Csv => print_csv(sanitized_llc_rows(build_llc_rows(llcs, data))),
        _ => render(build_llc_rows(llcs, data), format),
    }
}

pub fn print_clients(clients: &[&Client], data: &Dataset, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&clients);
            Ok(())
        }
        OutputFormat::Csv => print_csv(sanitized_client_rows(build_client_rows(clients, data))),
        _ => render(build_client_rows(clients, data), format),
    }
}

pub fn print_properties(properties: &[&Property], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&properties);
            Ok(())
        }
        OutputFormat::Csv => print_csv(sanitized_property_rows(build_property_rows(properties))),
        _ => render(build_property_rows(properties), format),
    }
}

pub fn print_summary(summary: &Summary, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(summary);
            Ok(())
        }
        _ => render(build_summary_rows(summary), format),
    }
}

pub fn print_ingest_report(report: &IngestReport, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(report);
            Ok(())
        }
        _ => render(build_file_report_rows(report), format),
    }
}

fn sanitized_llc_rows(rows: Vec<LlcRow>) -> Vec<LlcRow> {
    rows.into_iter()
        .map(|r| LlcRow {
            name: sanitize_csv_field(&r.name),
            contact: sanitize_csv_field(&r.contact),
            email: sanitize_csv_field(&r.email),
            phone: sanitize_csv_field(&r.phone),
            ..r
        })
        .collect()
}

fn sanitized_client_rows(rows: Vec<ClientRow>) -> Vec<ClientRow> {
    rows.into_iter()
        .map(|r| ClientRow {
            name: sanitize_csv_field(&r.name),
            contact: sanitize_csv_field(&r.contact),
            phone: sanitize_csv_field(&r.phone),
            llc: sanitize_csv_field(&r.llc),
            ..r
        })
        .collect()
}

fn sanitized_property_rows(rows: Vec<PropertyRow>) -> Vec<PropertyRow> {
    rows.into_iter()
        .map(|r| PropertyRow {
            address: sanitize_csv_field(&r.address),
            owner: sanitize_csv_field(&r.owner),
            ..r
        })
        .collect()
}

// -- JSON output --

pub fn print_json<T: serde::Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

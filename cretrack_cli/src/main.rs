mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cretrack_lib::TrackerConfig;

use crate::commands::list::Collection;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "cretrack")]
#[command(about = "Import and track commercial real estate owners, contacts and properties")]
struct Cli {
    /// Output format: table, json, csv or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// SQLite database path (falls back to CRETRACK_DB, then cretrack.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML config file; defaults apply when it does not exist
    #[arg(long, default_value = "cretrack.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import one or more CSV exports
    Ingest(commands::ingest::IngestArgs),
    /// List LLCs
    Llcs(commands::list::ListArgs),
    /// List clients
    Clients(commands::list::ListArgs),
    /// List properties
    Properties(commands::list::ListArgs),
    /// Show overview counts
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cretrack=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = OutputFormat::parse(&cli.output);
    let config = TrackerConfig::load(&cli.config)?;
    let db_path = cli
        .db
        .clone()
        .or_else(|| std::env::var("CRETRACK_DB").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("cretrack.db"));

    match &cli.command {
        Commands::Ingest(args) => commands::ingest::run(args, &db_path, config, &format).await?,
        Commands::Llcs(args) => {
            commands::list::run(Collection::Llcs, args, &db_path, config, &format)?
        }
        Commands::Clients(args) => {
            commands::list::run(Collection::Clients, args, &db_path, config, &format)?
        }
        Commands::Properties(args) => {
            commands::list::run(Collection::Properties, args, &db_path, config, &format)?
        }
        Commands::Summary => commands::summary::run(&db_path, config, &format)?,
    }

    Ok(())
}

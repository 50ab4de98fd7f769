//! Argument grammar (spec.md §6: exit codes, `etl mixed|quotes|indices`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Quotron: market-data ingestion core.
#[derive(Parser)]
#[command(name = "quotron", version, about = "Market-data ingestion daemon and offline ETL CLI")]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "config.json", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduler and the HTTP/WebSocket gateway until interrupted.
    Run,
    /// Validate, enrich, and persist a batch of rows read from a file.
    Etl(EtlArgs),
}

#[derive(Parser)]
pub struct EtlArgs {
    #[command(subcommand)]
    pub kind: EtlKind,
}

#[derive(Subcommand)]
pub enum EtlKind {
    /// File holds `{"quotes": [...], "indices": [...]}`.
    Mixed(EtlFileArgs),
    /// File holds a JSON array of quotes.
    Quotes(EtlFileArgs),
    /// File holds a JSON array of market indices.
    Indices(EtlFileArgs),
}

#[derive(Parser)]
pub struct EtlFileArgs {
    /// Path to the JSON input file.
    pub file: PathBuf,
    /// Source tag recorded on the batch.
    #[arg(long)]
    pub source: String,
    /// Accept rows older than the 24h staleness window.
    #[arg(long)]
    pub allow_old_data: bool,
}

//! `etl mixed|quotes|indices` (spec.md §6): offline batch ingestion against
//! an already-configured database.

use quotron_core::QuotronError;
use quotron_etl::{EtlInput, EtlStore, RawRow};
use quotron_types::{BatchState, MarketIndex, Quote, Source};
use serde::Deserialize;

use crate::cli::{EtlFileArgs, EtlKind};

fn parse_source(raw: &str) -> Result<Source, QuotronError> {
    match raw {
        "alpha_vantage" => Ok(Source::AlphaVantage),
        "yahoo_direct" => Ok(Source::YahooDirect),
        "yahoo_rest" => Ok(Source::YahooRest),
        "yahoo_sidecar" => Ok(Source::YahooSidecar),
        "manual" => Ok(Source::Manual),
        other => Err(QuotronError::Config(format!("unknown --source tag: {other}"))),
    }
}

#[derive(Deserialize)]
struct MixedFile {
    #[serde(default)]
    quotes: Vec<Quote>,
    #[serde(default)]
    indices: Vec<MarketIndex>,
}

async fn read_rows(kind: &EtlKind) -> Result<(Vec<RawRow>, &EtlFileArgs), QuotronError> {
    let (args, rows) = match kind {
        EtlKind::Mixed(args) => {
            let body = tokio::fs::read_to_string(&args.file)
                .await
                .map_err(|e| QuotronError::Config(format!("reading {:?}: {e}", args.file)))?;
            let parsed: MixedFile =
                serde_json::from_str(&body).map_err(|e| QuotronError::Config(format!("parsing {:?}: {e}", args.file)))?;
            let mut rows: Vec<RawRow> = parsed.quotes.into_iter().map(RawRow::Quote).collect();
            rows.extend(parsed.indices.into_iter().map(RawRow::Index));
            (args, rows)
        }
        EtlKind::Quotes(args) => {
            let body = tokio::fs::read_to_string(&args.file)
                .await
                .map_err(|e| QuotronError::Config(format!("reading {:?}: {e}", args.file)))?;
            let parsed: Vec<Quote> =
                serde_json::from_str(&body).map_err(|e| QuotronError::Config(format!("parsing {:?}: {e}", args.file)))?;
            (args, parsed.into_iter().map(RawRow::Quote).collect())
        }
        EtlKind::Indices(args) => {
            let body = tokio::fs::read_to_string(&args.file)
                .await
                .map_err(|e| QuotronError::Config(format!("reading {:?}: {e}", args.file)))?;
            let parsed: Vec<MarketIndex> =
                serde_json::from_str(&body).map_err(|e| QuotronError::Config(format!("parsing {:?}: {e}", args.file)))?;
            (args, parsed.into_iter().map(RawRow::Index).collect())
        }
    };
    Ok((rows, args))
}

/// Read and validate the input file and `--source` tag, without touching
/// the database. Letting argument/file errors surface before a DB
/// connection is attempted keeps `quotron etl` fast-failing on bad input.
///
/// # Errors
/// Returns [`QuotronError::Config`] if the file is missing, malformed, or
/// `--source` names an unknown tag.
pub async fn prepare(kind: &EtlKind) -> Result<EtlInput, QuotronError> {
    let (rows, args) = read_rows(kind).await?;
    let source = parse_source(&args.source)?;
    Ok(EtlInput::new(rows, source, args.allow_old_data))
}

/// Run the requested `etl` subcommand against `store`.
///
/// Returns the process exit code per spec.md §6: `0` every row persisted
/// cleanly, `2` some rows were rejected or a sub-batch failed but the batch
/// otherwise completed, `3` nothing was persisted.
pub async fn run(store: &EtlStore, input: EtlInput) -> u8 {
    match quotron_etl::run(store, input).await {
        Ok(output) => {
            tracing::info!(
                batch = %output.batch.id,
                state = ?output.batch.state,
                rejected = output.errors.len(),
                "etl run complete"
            );
            match output.batch.state {
                BatchState::Completed if output.errors.is_empty() => 0,
                BatchState::Completed => 2,
                _ => 3,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "etl pipeline failed");
            3
        }
    }
}

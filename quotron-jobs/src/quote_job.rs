//! Shared template for `stock_quotes` and `crypto_quotes` (spec.md §4.6):
//! parse the comma-list, normalize, fetch through the failover chain, write
//! an artifact, publish, and invoke the ETL pipeline.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use quotron::FailoverChain;
use quotron_core::{normalize, QuotronError, StreamBus, StreamName};
use quotron_etl::{EtlInput, EtlStore, RawRow};
use quotron_scheduler::Job;
use chrono::{DateTime, Utc};
use quotron_types::{Quote, Source};
use tracing::{info, warn};

/// Which of the two quote-shaped capabilities a [`QuoteJob`] drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    /// Equity lookups, registered as `stock_quotes`.
    Stock,
    /// Cryptocurrency lookups, registered as `crypto_quotes`.
    Crypto,
}

impl QuoteKind {
    fn normalize(self, raw: &str) -> String {
        match self {
            Self::Stock => normalize::normalize_equity(raw),
            Self::Crypto => normalize::normalize_crypto(raw),
        }
    }

    const fn stream(self) -> StreamName {
        match self {
            Self::Stock => StreamName::Stocks,
            Self::Crypto => StreamName::Crypto,
        }
    }

    const fn job_name(self) -> &'static str {
        match self {
            Self::Stock => "stock_quotes",
            Self::Crypto => "crypto_quotes",
        }
    }
}

/// The filesystem path an artifact for `symbol`, fetched from `source` at
/// `timestamp`, is written to (spec.md §6:
/// `{output_dir}/{symbol|index}-[{source}-]{yyyymmdd-hhmmss}.json`).
#[must_use]
pub fn artifact_path(output_dir: &std::path::Path, symbol: &str, source: Source, timestamp: DateTime<Utc>) -> PathBuf {
    let stamp = timestamp.format("%Y%m%d-%H%M%S");
    output_dir.join(format!("{symbol}-{source}-{stamp}.json"))
}

/// Fetches, persists, and publishes one quote-shaped capability.
pub struct QuoteJob {
    kind: QuoteKind,
    chain: Arc<FailoverChain>,
    stream: Arc<dyn StreamBus>,
    store: Arc<EtlStore>,
    output_dir: PathBuf,
}

impl QuoteJob {
    /// Build a job for `kind`, fetching through `chain`.
    #[must_use]
    pub fn new(
        kind: QuoteKind,
        chain: Arc<FailoverChain>,
        stream: Arc<dyn StreamBus>,
        store: Arc<EtlStore>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            kind,
            chain,
            stream,
            store,
            output_dir,
        }
    }

    async fn fetch_one(&self, raw_symbol: &str) -> Result<Quote, QuotronError> {
        let symbol = self.kind.normalize(raw_symbol);
        normalize::reject_invalid_input(&symbol).map_err(QuotronError::SchemaViolation)?;
        match self.kind {
            QuoteKind::Stock => self.chain.get_stock_quote(&symbol).await,
            QuoteKind::Crypto => self.chain.get_crypto_quote(&symbol).await,
        }
    }

    async fn write_artifact(&self, quote: &Quote) -> Result<(), QuotronError> {
        let path = artifact_path(&self.output_dir, &quote.symbol, quote.source, quote.timestamp);
        let body = serde_json::to_vec_pretty(quote)
            .map_err(|e| QuotronError::Parse(format!("serializing artifact: {e}")))?;
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| QuotronError::Other(e.to_string()))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| QuotronError::Other(e.to_string()))
    }
}

#[async_trait]
impl Job for QuoteJob {
    fn name(&self) -> &'static str {
        self.kind.job_name()
    }

    fn description(&self) -> &'static str {
        match self.kind {
            QuoteKind::Stock => "Fetches, persists, and publishes equity quotes.",
            QuoteKind::Crypto => "Fetches, persists, and publishes cryptocurrency quotes.",
        }
    }

    async fn execute(&self, params: HashMap<String, String>) -> Result<(), QuotronError> {
        let symbols = params.get("symbols").cloned().unwrap_or_default();
        let wanted: Vec<&str> = symbols.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        if wanted.is_empty() {
            return Err(QuotronError::Config("no symbols configured".to_string()));
        }

        let mut fetched = Vec::with_capacity(wanted.len());
        let mut errors = Vec::new();

        for raw in &wanted {
            match self.fetch_one(raw).await {
                Ok(quote) => fetched.push(quote),
                Err(err) => {
                    warn!(job = self.name(), symbol = raw, error = %err, "item failed");
                    errors.push(err);
                }
            }
        }

        if fetched.is_empty() {
            return Err(QuotronError::AllProvidersFailed(errors));
        }

        for quote in &fetched {
            if let Err(e) = self.write_artifact(quote).await {
                warn!(job = self.name(), symbol = quote.symbol, error = %e, "artifact write failed");
            }
            let payload = serde_json::to_string(quote)
                .map_err(|e| QuotronError::Parse(format!("serializing stream payload: {e}")))?;
            self.stream.publish(self.kind.stream(), payload).await?;
        }

        let source = fetched[0].source;
        let rows = fetched.into_iter().map(RawRow::Quote).collect();
        let input = EtlInput::new(rows, source, false);
        let output = quotron_etl::run(&self.store, input).await?;

        info!(
            job = self.name(),
            batch = %output.batch.id,
            rejected = errors.len() + output.errors.len(),
            "run complete"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_path_matches_spec_naming() {
        let ts = chrono::DateTime::parse_from_rfc3339("2023-11-14T22:13:20Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let p = artifact_path(std::path::Path::new("data"), "AAPL", quotron_types::Source::YahooSidecar, ts);
        assert_eq!(p, PathBuf::from("data/AAPL-yahoo_sidecar-20231114-221320.json"));
    }

    #[test]
    fn crypto_job_normalizes_before_fetch() {
        assert_eq!(QuoteKind::Crypto.normalize("eth"), "ETH-USD");
        assert_eq!(QuoteKind::Stock.normalize(" ^djia "), "^DJIA");
    }
}

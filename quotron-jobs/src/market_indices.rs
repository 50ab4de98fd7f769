//! `market_indices` job (spec.md §4.6): same fetch/artifact/publish/ETL
//! template as [`crate::quote_job`], specialized to index lookups.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use quotron::FailoverChain;
use quotron_core::{normalize, QuotronError, StreamBus, StreamName};
use quotron_etl::{EtlInput, EtlStore, RawRow};
use quotron_scheduler::Job;
use quotron_types::MarketIndex;
use tracing::{info, warn};

use crate::quote_job::artifact_path;

/// Fetches, persists, and publishes market index observations.
pub struct MarketIndicesJob {
    chain: Arc<FailoverChain>,
    stream: Arc<dyn StreamBus>,
    store: Arc<EtlStore>,
    output_dir: PathBuf,
}

impl MarketIndicesJob {
    /// Build the job, fetching through `chain`.
    #[must_use]
    pub fn new(chain: Arc<FailoverChain>, stream: Arc<dyn StreamBus>, store: Arc<EtlStore>, output_dir: PathBuf) -> Self {
        Self {
            chain,
            stream,
            store,
            output_dir,
        }
    }

    async fn write_artifact(&self, index: &MarketIndex) -> Result<(), QuotronError> {
        let path = artifact_path(&self.output_dir, &index.symbol, index.source, index.timestamp);
        let body = serde_json::to_vec_pretty(index)
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
impl Job for MarketIndicesJob {
    fn name(&self) -> &'static str {
        "market_indices"
    }

    fn description(&self) -> &'static str {
        "Fetches, persists, and publishes composite market index observations."
    }

    async fn execute(&self, params: HashMap<String, String>) -> Result<(), QuotronError> {
        let raw_names = params.get("indices").cloned().unwrap_or_default();
        let wanted: Vec<&str> = raw_names.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        if wanted.is_empty() {
            return Err(QuotronError::Config("no indices configured".to_string()));
        }

        let mut fetched = Vec::with_capacity(wanted.len());
        let mut errors = Vec::new();

        for raw in &wanted {
            let symbol = normalize::normalize_equity(raw);
            match self.chain.get_market_index(&symbol).await {
                Ok(index) => fetched.push(index),
                Err(err) => {
                    warn!(job = "market_indices", index = raw, error = %err, "item failed");
                    errors.push(err);
                }
            }
        }

        if fetched.is_empty() {
            return Err(QuotronError::AllProvidersFailed(errors));
        }

        for index in &fetched {
            if let Err(e) = self.write_artifact(index).await {
                warn!(job = "market_indices", symbol = index.symbol, error = %e, "artifact write failed");
            }
            let payload = serde_json::to_string(index)
                .map_err(|e| QuotronError::Parse(format!("serializing stream payload: {e}")))?;
            self.stream.publish(StreamName::Indices, payload).await?;
        }

        let source = fetched[0].source;
        let rows = fetched.into_iter().map(RawRow::Index).collect();
        let input = EtlInput::new(rows, source, false);
        let output = quotron_etl::run(&self.store, input).await?;

        info!(
            job = "market_indices",
            batch = %output.batch.id,
            rejected = errors.len() + output.errors.len(),
            "run complete"
        );

        Ok(())
    }
}

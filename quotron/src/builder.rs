//! Assembles the two failover chains from configuration (spec.md §4.1).

use std::sync::Arc;

use quotron_core::{AppConfig, Provider};
use quotron_middleware::{HealthGatedProvider, QuotaAwareProvider, QuotaConfig};
use quotron_providers::{AlphaVantageProvider, YahooRestProvider, YahooSidecarProvider};
use quotron_types::Source;

use crate::router::FailoverChain;

/// The two chains a running system needs: one for equities/indices, one
/// for crypto (spec.md §4.1: crypto skips the primary rate-limited provider).
pub struct Chains {
    /// `alpha_vantage -> yahoo_sidecar -> yahoo_rest`.
    pub equity: FailoverChain,
    /// `yahoo_sidecar -> yahoo_rest`.
    pub crypto: FailoverChain,
}

/// Build both chains from `config` and the sidecar's resolved base URL.
/// Every provider is wrapped with the health gate; the primary provider is
/// additionally wrapped with its quota budget.
#[must_use]
pub fn build_chains(config: &AppConfig, yahoo_sidecar_base_url: &str) -> Chains {
    let alpha_vantage: Arc<dyn Provider> = Arc::new(QuotaAwareProvider::new(
        Arc::new(AlphaVantageProvider::new(config.api_key.clone())),
        QuotaConfig::primary_provider(),
    ));
    let alpha_vantage = gate(alpha_vantage);

    let yahoo_sidecar: Arc<dyn Provider> = gate(Arc::new(YahooSidecarProvider::new(yahoo_sidecar_base_url)));
    let yahoo_rest: Arc<dyn Provider> = gate(Arc::new(YahooRestProvider::new(Source::YahooRest)));

    Chains {
        equity: FailoverChain::new(vec![
            Arc::clone(&alpha_vantage),
            Arc::clone(&yahoo_sidecar),
            Arc::clone(&yahoo_rest),
        ]),
        crypto: FailoverChain::new(vec![yahoo_sidecar, yahoo_rest]),
    }
}

fn gate(provider: Arc<dyn Provider>) -> Arc<dyn Provider> {
    Arc::new(HealthGatedProvider::new(provider))
}

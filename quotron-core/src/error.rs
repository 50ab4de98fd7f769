use thiserror::Error;

/// Unified error type for the Quotron workspace.
///
/// Variants are exactly the taxonomy `spec.md` §7 says the core distinguishes,
/// plus `Unsupported`/`Other` escape hatches for capability mismatches and
/// opaque failures, mirroring the teacher's `BorsaError`.
#[derive(Debug, Error, Clone)]
pub enum QuotronError {
    /// Missing or invalid API key/credential.
    #[error("auth denied: {0}")]
    AuthDenied(String),

    /// HTTP 429 or a provider-specific rate-limit signal.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Upstream reported the symbol/resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failure, 5xx, or other likely-transient condition.
    #[error("transient: {0}")]
    Transient(String),

    /// Response body did not parse as expected.
    #[error("parse error: {0}")]
    Parse(String),

    /// The call did not complete before its deadline.
    #[error("timeout")]
    Timeout,

    /// The provider's own health is `failed`; do not dispatch to it.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// A row failed `spec.md` §3 validation.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Symbol normalization could not produce a valid ticker.
    #[error("normalization failed: {0}")]
    NormalizationFailed(String),

    /// Row timestamp is older than the allowed retention window.
    #[error("stale data")]
    Stale,

    /// Same `(symbol, timestamp)` appeared twice within one batch.
    #[error("duplicate in batch")]
    DuplicateInBatch,

    /// Upsert lost a race on the natural key; treated as a no-op success.
    #[error("database conflict")]
    DbConflict,

    /// Likely-transient database error (connection reset, deadlock, ...).
    #[error("database transient error: {0}")]
    DbTransient(String),

    /// Bad or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operation was cancelled; not a failure, the contractual way to stop.
    #[error("cancelled")]
    Cancelled,

    /// Requested capability is not implemented by this provider.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// Every provider in a failover chain returned a terminal error.
    #[error("all providers failed: {0:?}")]
    AllProvidersFailed(Vec<QuotronError>),

    /// Opaque/uncategorized error.
    #[error("error: {0}")]
    Other(String),
}

impl QuotronError {
    /// Whether this error class should advance the failover chain
    /// immediately rather than retrying the same provider (spec.md §4.1).
    #[must_use]
    pub const fn advances_failover_immediately(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::AuthDenied(_))
    }

    /// Whether this error class should be retried against the same provider
    /// with exponential backoff before advancing (spec.md §4.1).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout)
    }

    /// Whether this error abandons the symbol outright (no retry, no
    /// failover — the symbol just does not exist upstream).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for QuotronError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

//! The stream bus abstraction (spec.md §4.4, component C4): typed
//! publish/subscribe over named, capped, durable streams. This module
//! defines the seam; `quotron-stream` implements it against Redis Streams
//! and `quotron-mock` implements an in-memory fake for tests.

use async_trait::async_trait;

use crate::error::QuotronError;

/// Hard cap on messages retained per stream (spec.md §4.4).
pub const STREAM_MAX_LEN: usize = 1000;

/// The four named streams the system publishes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamName {
    /// `quotron:stocks:stream`
    Stocks,
    /// `quotron:crypto:stream`
    Crypto,
    /// `quotron:indices:stream`
    Indices,
    /// `quotron:alerts:stream`
    Alerts,
}

impl StreamName {
    /// The Redis key this stream is addressed by.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Stocks => "quotron:stocks:stream",
            Self::Crypto => "quotron:crypto:stream",
            Self::Indices => "quotron:indices:stream",
            Self::Alerts => "quotron:alerts:stream",
        }
    }
}

/// One message read back from a stream: its server-assigned ID and the
/// JSON payload carried in its single `data` field.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// Server-assigned ID (time-sequence pair, e.g. `"1700000000000-0"`).
    pub id: String,
    /// Raw JSON payload, as published.
    pub data: String,
}

/// Before/after lengths captured by a trim operation (spec.md §4.6).
#[derive(Debug, Clone, Copy)]
pub struct TrimReport {
    /// Length observed before trimming.
    pub before: usize,
    /// Length observed after trimming (at most [`STREAM_MAX_LEN`]).
    pub after: usize,
}

/// Durable, capped, ordered publish/subscribe substrate.
///
/// Implementors must cap every stream at [`STREAM_MAX_LEN`] on every write
/// (spec.md §4.4) and preserve append order within a stream; no ordering is
/// guaranteed across streams.
#[async_trait]
pub trait StreamBus: Send + Sync {
    /// Append `json_payload` as the `data` field of a new message, capping
    /// the stream at [`STREAM_MAX_LEN`]. Returns the server-assigned ID.
    async fn publish(&self, stream: StreamName, json_payload: String) -> Result<String, QuotronError>;

    /// Ensure `group` exists on `stream`, starting from the stream's
    /// current tail if newly created (idempotent: an existing group is
    /// left untouched, not an error).
    async fn ensure_group(&self, stream: StreamName, group: &str) -> Result<(), QuotronError>;

    /// Block up to `block_ms` for up to `count` undelivered messages for
    /// `consumer` within `group`.
    async fn read_group(
        &self,
        stream: StreamName,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<StreamMessage>, QuotronError>;

    /// Acknowledge a message within `group`, removing it from the pending
    /// entries list.
    async fn ack(&self, stream: StreamName, group: &str, id: &str) -> Result<(), QuotronError>;

    /// Reclaim messages pending longer than `min_idle_ms` for `consumer`,
    /// for redelivery after a crashed consumer is restarted.
    async fn reclaim_stale(
        &self,
        stream: StreamName,
        group: &str,
        consumer: &str,
        min_idle_ms: u64,
    ) -> Result<Vec<StreamMessage>, QuotronError>;

    /// Trim the stream to [`STREAM_MAX_LEN`], reporting the lengths
    /// observed before and after.
    async fn trim(&self, stream: StreamName) -> Result<TrimReport, QuotronError>;

    /// Current length of the stream (`XLEN`).
    async fn len(&self, stream: StreamName) -> Result<usize, QuotronError>;
}

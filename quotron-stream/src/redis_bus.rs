//! [`StreamBus`] implementation against Redis Streams (spec.md §4.4).

use async_trait::async_trait;
use quotron_core::{QuotronError, StreamBus, StreamMessage, StreamName, TrimReport, STREAM_MAX_LEN};
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, warn};

const DATA_FIELD: &str = "data";

fn classify_redis_error(err: redis::RedisError) -> QuotronError {
    if err.is_timeout() {
        QuotronError::Timeout
    } else if err.is_connection_dropped() || err.is_io_error() {
        QuotronError::Transient(err.to_string())
    } else {
        QuotronError::Other(err.to_string())
    }
}

/// [`StreamBus`] backed by a live Redis connection. Cheaply cloneable —
/// `ConnectionManager` reconnects transparently on failure.
#[derive(Clone)]
pub struct RedisStreamBus {
    conn: ConnectionManager,
}

impl RedisStreamBus {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, QuotronError> {
        let client = redis::Client::open(url)
            .map_err(|e| QuotronError::Config(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(classify_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl StreamBus for RedisStreamBus {
    async fn publish(&self, stream: StreamName, json_payload: String) -> Result<String, QuotronError> {
        let mut conn = self.conn.clone();
        let id: String = conn
            .xadd_maxlen(
                stream.key(),
                redis::streams::StreamMaxlen::Equals(STREAM_MAX_LEN),
                "*",
                &[(DATA_FIELD, json_payload)],
            )
            .await
            .map_err(classify_redis_error)?;
        Ok(id)
    }

    async fn ensure_group(&self, stream: StreamName, group: &str) -> Result<(), QuotronError> {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = conn.xgroup_create_mkstream(stream.key(), group, "$").await;
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(group, stream = stream.key(), "consumer group already exists");
                Ok(())
            }
            Err(e) => Err(classify_redis_error(e)),
        }
    }

    async fn read_group(
        &self,
        stream: StreamName,
        group: &str,
        consumer: &str,
        count: usize,
        block_ms: u64,
    ) -> Result<Vec<StreamMessage>, QuotronError> {
        let mut conn = self.conn.clone();
        let opts = StreamReadOptions::default()
            .group(group, consumer)
            .count(count)
            .block(usize::try_from(block_ms).unwrap_or(usize::MAX));
        let reply: StreamReadReply = conn
            .xread_options(&[stream.key()], &[">"], &opts)
            .await
            .map_err(classify_redis_error)?;

        let mut out = Vec::new();
        for stream_key in reply.keys {
            for entry in stream_key.ids {
                let data = entry
                    .map
                    .get(DATA_FIELD)
                    .and_then(|v| redis::from_redis_value::<String>(v).ok())
                    .unwrap_or_default();
                out.push(StreamMessage { id: entry.id, data });
            }
        }
        Ok(out)
    }

    async fn ack(&self, stream: StreamName, group: &str, id: &str) -> Result<(), QuotronError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .xack(stream.key(), group, &[id])
            .await
            .map_err(classify_redis_error)?;
        Ok(())
    }

    async fn reclaim_stale(
        &self,
        stream: StreamName,
        group: &str,
        consumer: &str,
        min_idle_ms: u64,
    ) -> Result<Vec<StreamMessage>, QuotronError> {
        let mut conn = self.conn.clone();
        let pending: redis::streams::StreamPendingCountReply = conn
            .xpending_count(stream.key(), group, "-", "+", 100)
            .await
            .map_err(classify_redis_error)?;

        let stale_ids: Vec<String> = pending
            .ids
            .into_iter()
            .filter(|p| p.time_since_delivered >= min_idle_ms.try_into().unwrap_or(i64::MAX))
            .map(|p| p.id)
            .collect();

        if stale_ids.is_empty() {
            return Ok(Vec::new());
        }

        let claimed: StreamReadReply = conn
            .xclaim(
                stream.key(),
                group,
                consumer,
                min_idle_ms.try_into().unwrap_or(0),
                &stale_ids,
            )
            .await
            .map_err(classify_redis_error)?;

        let mut out = Vec::new();
        for stream_key in claimed.keys {
            for entry in stream_key.ids {
                let data = entry
                    .map
                    .get(DATA_FIELD)
                    .and_then(|v| redis::from_redis_value::<String>(v).ok())
                    .unwrap_or_default();
                out.push(StreamMessage { id: entry.id, data });
            }
        }
        Ok(out)
    }

    async fn trim(&self, stream: StreamName) -> Result<TrimReport, QuotronError> {
        let mut conn = self.conn.clone();
        let before: usize = conn.xlen(stream.key()).await.map_err(classify_redis_error)?;
        let _: i64 = conn
            .xtrim(
                stream.key(),
                redis::streams::StreamMaxlen::Equals(STREAM_MAX_LEN),
            )
            .await
            .map_err(classify_redis_error)?;
        let after: usize = conn.xlen(stream.key()).await.map_err(classify_redis_error)?;
        if before > STREAM_MAX_LEN {
            warn!(stream = stream.key(), before, after, "trimmed stream to cap");
        }
        Ok(TrimReport { before, after })
    }

    async fn len(&self, stream: StreamName) -> Result<usize, QuotronError> {
        let mut conn = self.conn.clone();
        conn.xlen(stream.key()).await.map_err(classify_redis_error)
    }
}

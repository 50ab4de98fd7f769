//! In-memory [`StreamBus`] fake for tests that don't need live Redis.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use quotron_core::{QuotronError, StreamBus, StreamMessage, StreamName, TrimReport, STREAM_MAX_LEN};

struct StreamState {
    messages: VecDeque<(u64, String)>,
    next_id: u64,
    groups: HashMap<String, GroupState>,
}

impl StreamState {
    fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            next_id: 0,
            groups: HashMap::new(),
        }
    }
}

struct GroupState {
    /// Index into `messages` (by id) not yet delivered to any consumer.
    next_unread_id: u64,
    pending: Vec<(u64, String)>,
}

/// An in-process stand-in for the Redis-backed stream bus. Enforces the
/// same [`STREAM_MAX_LEN`] cap and group/ack semantics, entirely in memory.
pub struct FakeStreamBus {
    streams: Mutex<HashMap<&'static str, StreamState>>,
}

impl Default for FakeStreamBus {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStreamBus {
    /// Build an empty fake bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl StreamBus for FakeStreamBus {
    async fn publish(&self, stream: StreamName, json_payload: String) -> Result<String, QuotronError> {
        let mut streams = self.streams.lock().expect("mutex poisoned");
        let state = streams.entry(stream.key()).or_insert_with(StreamState::new);
        let id = state.next_id;
        state.next_id += 1;
        state.messages.push_back((id, json_payload));
        while state.messages.len() > STREAM_MAX_LEN {
            state.messages.pop_front();
        }
        Ok(format!("{id}-0"))
    }

    async fn ensure_group(&self, stream: StreamName, group: &str) -> Result<(), QuotronError> {
        let mut streams = self.streams.lock().expect("mutex poisoned");
        let state = streams.entry(stream.key()).or_insert_with(StreamState::new);
        state.groups.entry(group.to_string()).or_insert_with(|| GroupState {
            next_unread_id: state.next_id,
            pending: Vec::new(),
        });
        Ok(())
    }

    async fn read_group(
        &self,
        stream: StreamName,
        group: &str,
        _consumer: &str,
        count: usize,
        _block_ms: u64,
    ) -> Result<Vec<StreamMessage>, QuotronError> {
        let mut streams = self.streams.lock().expect("mutex poisoned");
        let state = streams
            .get_mut(stream.key())
            .ok_or_else(|| QuotronError::NotFound(format!("stream {}", stream.key())))?;
        let group_state = state
            .groups
            .get_mut(group)
            .ok_or_else(|| QuotronError::NotFound(format!("group {group}")))?;

        let mut out = Vec::new();
        for (id, data) in &state.messages {
            if *id >= group_state.next_unread_id && out.len() < count {
                out.push(StreamMessage {
                    id: format!("{id}-0"),
                    data: data.clone(),
                });
                group_state.pending.push((*id, data.clone()));
                group_state.next_unread_id = id + 1;
            }
        }
        Ok(out)
    }

    async fn ack(&self, stream: StreamName, group: &str, id: &str) -> Result<(), QuotronError> {
        let numeric_id: u64 = id
            .split('-')
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| QuotronError::Parse(format!("bad message id {id}")))?;
        let mut streams = self.streams.lock().expect("mutex poisoned");
        if let Some(state) = streams.get_mut(stream.key()) {
            if let Some(group_state) = state.groups.get_mut(group) {
                group_state.pending.retain(|(pending_id, _)| *pending_id != numeric_id);
            }
        }
        Ok(())
    }

    async fn reclaim_stale(
        &self,
        stream: StreamName,
        group: &str,
        _consumer: &str,
        _min_idle_ms: u64,
    ) -> Result<Vec<StreamMessage>, QuotronError> {
        let streams = self.streams.lock().expect("mutex poisoned");
        let Some(state) = streams.get(stream.key()) else {
            return Ok(Vec::new());
        };
        let Some(group_state) = state.groups.get(group) else {
            return Ok(Vec::new());
        };
        Ok(group_state
            .pending
            .iter()
            .map(|(id, data)| StreamMessage {
                id: format!("{id}-0"),
                data: data.clone(),
            })
            .collect())
    }

    async fn trim(&self, stream: StreamName) -> Result<TrimReport, QuotronError> {
        let mut streams = self.streams.lock().expect("mutex poisoned");
        let state = streams.entry(stream.key()).or_insert_with(StreamState::new);
        let before = state.messages.len();
        while state.messages.len() > STREAM_MAX_LEN {
            state.messages.pop_front();
        }
        Ok(TrimReport {
            before,
            after: state.messages.len(),
        })
    }

    async fn len(&self, stream: StreamName) -> Result<usize, QuotronError> {
        let streams = self.streams.lock().expect("mutex poisoned");
        Ok(streams.get(stream.key()).map_or(0, |s| s.messages.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn caps_at_max_len() {
        let bus = FakeStreamBus::new();
        for i in 0..1500 {
            bus.publish(StreamName::Stocks, format!("{{\"n\":{i}}}")).await.unwrap();
        }
        assert_eq!(bus.len(StreamName::Stocks).await.unwrap(), STREAM_MAX_LEN);
    }

    #[tokio::test]
    async fn group_read_then_ack_clears_pending() {
        let bus = FakeStreamBus::new();
        bus.publish(StreamName::Alerts, "{}".to_string()).await.unwrap();
        bus.ensure_group(StreamName::Alerts, "g1").await.unwrap();
        let msgs = bus.read_group(StreamName::Alerts, "g1", "c1", 10, 0).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(bus.reclaim_stale(StreamName::Alerts, "g1", "c1", 0).await.unwrap().len(), 1);
        bus.ack(StreamName::Alerts, "g1", &msgs[0].id).await.unwrap();
        assert!(bus.reclaim_stale(StreamName::Alerts, "g1", "c1", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn trim_reports_before_and_after() {
        let bus = FakeStreamBus::new();
        for i in 0..1500 {
            bus.publish(StreamName::Indices, format!("{i}")).await.unwrap();
        }
        let report = bus.trim(StreamName::Indices).await.unwrap();
        assert_eq!(report.before, STREAM_MAX_LEN);
        assert_eq!(report.after, STREAM_MAX_LEN);
    }
}

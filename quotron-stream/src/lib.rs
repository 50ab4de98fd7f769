//! quotron-stream
//!
//! Redis Streams-backed [`StreamBus`](quotron_core::StreamBus) (spec.md
//! §4.4, component C4): capped length, consumer groups, ack, and pending
//! reclaim for stalled consumers.
#![warn(missing_docs)]

/// Redis-backed [`StreamBus`](quotron_core::StreamBus) implementation.
pub mod redis_bus;

pub use redis_bus::RedisStreamBus;

//! quotron-mock
//!
//! Test doubles: a [`Provider`](quotron_core::Provider) with per-symbol
//! canned responses and failure injection, and an in-memory
//! [`StreamBus`](quotron_core::StreamBus) fake.
#![warn(missing_docs)]

/// Mock provider with configurable canned responses per symbol.
pub mod provider;
/// In-memory stream bus fake.
pub mod stream;

pub use provider::{Canned, MockError, MockProvider};
pub use stream::FakeStreamBus;

//! Live telemetry distribution
//!
//! One slow-arriving producer (ingest), many long-lived SSE viewers. The bus
//! owns the latest snapshot, a bounded history ring, and the subscriber
//! registry; sessions are the per-viewer handles into it.

pub mod bus;
pub mod session;

pub use bus::{BroadcastHandle, LiveBus, Subscriber};

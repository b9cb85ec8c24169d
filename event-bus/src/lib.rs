//! Billing event stream
//!
//! In-process pub/sub for billing domain events:
//! - Typed event kinds with stable subject names
//! - JSON envelopes with UUIDv7 ids for time-ordering and gap detection
//! - Broadcast fan-out: every subscriber sees every event
//! - Observability via Prometheus metrics
//!
//! The transport is a `tokio::sync::broadcast` channel. Consumers that fall
//! behind the channel capacity observe an explicit lag error rather than
//! blocking the publisher.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod bus;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod types;

pub use bus::{EventBus, EventSubscriber};
pub use envelope::EventEnvelope;
pub use error::{Error, Result};
pub use types::EventKind;

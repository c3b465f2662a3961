//! Channel plugin core.
//!
//! Connects a hosting application to a broker-backed pipeline: inbound
//! deliveries from the input pipe are decoded and surfaced as [`ChannelEvent`]s,
//! and outbound operations (`relay_message`, `log`, `log_exception`) validate
//! their arguments before serializing envelopes toward the configured queues.
//!
//! Validation is pure and synchronous; the broker is only touched after every
//! argument check has passed.

pub mod envelope;
pub mod error;
pub mod event;
pub mod plugin;

pub use {
    envelope::{ExceptionLogEntry, LogEntry, RelayEnvelope},
    error::{Error, Result, validation},
    event::ChannelEvent,
    plugin::ChannelPlugin,
};

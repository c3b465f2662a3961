//! Broker connector abstraction.
//!
//! The plugin core talks to the message broker exclusively through the
//! [`Broker`] trait: `publish` hands an opaque payload to a named queue,
//! `subscribe` yields a receiver of raw deliveries. Two implementations are
//! provided: [`AmqpBroker`] (lapin) for real deployments and
//! [`MemoryBroker`] for tests and local runs.

pub mod amqp;
pub mod error;
pub mod memory;

use {async_trait::async_trait, tokio::sync::mpsc};

pub use {
    amqp::AmqpBroker,
    error::{Error, Result},
    memory::MemoryBroker,
};

/// Connector contract toward the message broker.
///
/// Implementations must tolerate concurrent `publish` calls; the plugin core
/// shares one connector across the inbound loop and all outbound operations.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish a payload to a named queue. Resolves once the broker has
    /// accepted the message, not when any consumer has processed it.
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()>;

    /// Subscribe to a named queue.
    ///
    /// A successful return means the subscription is confirmed broker-side;
    /// deliveries arrive on the receiver in the order the broker hands them
    /// over. Dropping the receiver ends the subscription.
    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<Vec<u8>>>;
}

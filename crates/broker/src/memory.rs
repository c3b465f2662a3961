//! In-memory connector for tests and local runs.
//!
//! Queues exist implicitly; a publish with no subscribers is accepted and
//! dropped, matching a broker queue nobody consumes. Per-queue failure
//! injection lets tests exercise partial fan-out outcomes without a real
//! broker.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use {
    async_trait::async_trait,
    tokio::sync::{Mutex, mpsc},
};

use crate::{Broker, Error, Result};

const DELIVERY_BUFFER: usize = 256;

/// Broker connector that never leaves the process.
#[derive(Default)]
pub struct MemoryBroker {
    queues: Mutex<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>,
    failing: Mutex<HashSet<String>>,
    publishes: AtomicUsize,
}

impl MemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish to `queue` fail.
    pub async fn fail_publishes_to(&self, queue: &str) {
        self.failing.lock().await.insert(queue.to_string());
    }

    /// Undo [`fail_publishes_to`](Self::fail_publishes_to).
    pub async fn restore(&self, queue: &str) {
        self.failing.lock().await.remove(queue);
    }

    /// Number of accepted publishes across all queues, including publishes
    /// to queues with no subscribers.
    #[must_use]
    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        if self.failing.lock().await.contains(queue) {
            return Err(Error::publish(
                queue,
                std::io::Error::other("injected publish failure"),
            ));
        }

        self.publishes.fetch_add(1, Ordering::Relaxed);

        let senders = {
            let mut queues = self.queues.lock().await;
            if let Some(subs) = queues.get_mut(queue) {
                subs.retain(|tx| !tx.is_closed());
            }
            queues.get(queue).cloned().unwrap_or_default()
        };

        for tx in &senders {
            // A subscriber that went away mid-send is not a publish failure.
            let _ = tx.send(payload.clone()).await;
        }
        Ok(())
    }

    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<Vec<u8>>> {
        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        self.queues
            .lock()
            .await
            .entry(queue.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}

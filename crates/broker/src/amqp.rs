//! AMQP connector backed by lapin.
//!
//! One connection, one channel. Queues are declared durable on first use and
//! remembered so repeated publishes skip the declare round trip. Consumption
//! is auto-ack; redelivery and dead-lettering are broker policy, not ours.

use std::collections::HashSet;

use {
    async_trait::async_trait,
    futures::StreamExt,
    lapin::{
        BasicProperties, Channel, Connection, ConnectionProperties,
        options::{BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions},
        types::FieldTable,
    },
    tokio::sync::{Mutex, mpsc},
    tracing::{debug, info, warn},
};

use crate::{Broker, Error, Result};

/// In-flight deliveries buffered per subscription before backpressure.
const DELIVERY_BUFFER: usize = 256;

/// Broker connector over AMQP 0.9.1.
pub struct AmqpBroker {
    channel: Channel,
    declared: Mutex<HashSet<String>>,
    // Held so the connection outlives the channel.
    _connection: Connection,
}

impl AmqpBroker {
    /// Connect to the broker and open a channel.
    pub async fn connect(url: &str) -> Result<Self> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(Error::connect)?;
        let channel = connection.create_channel().await.map_err(Error::connect)?;
        info!("connected to AMQP broker");
        Ok(Self {
            channel,
            declared: Mutex::new(HashSet::new()),
            _connection: connection,
        })
    }

    /// Declare `queue` (durable) unless this connector already has.
    async fn ensure_queue(&self, queue: &str) -> lapin::Result<()> {
        let mut declared = self.declared.lock().await;
        if declared.contains(queue) {
            return Ok(());
        }
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        debug!(queue, "declared queue");
        declared.insert(queue.to_string());
        Ok(())
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        self.ensure_queue(queue)
            .await
            .map_err(|e| Error::publish(queue, e))?;
        let confirm = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| Error::publish(queue, e))?;
        confirm.await.map_err(|e| Error::publish(queue, e))?;
        Ok(())
    }

    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<Vec<u8>>> {
        self.ensure_queue(queue)
            .await
            .map_err(|e| Error::subscribe(queue, e))?;
        let mut consumer = self
            .channel
            .basic_consume(
                queue,
                &format!("pipeworks-{queue}"),
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::subscribe(queue, e))?;

        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        let queue_name = queue.to_string();
        tokio::spawn(async move {
            while let Some(delivery) = consumer.next().await {
                match delivery {
                    Ok(delivery) => {
                        if tx.send(delivery.data).await.is_err() {
                            debug!(queue = %queue_name, "delivery receiver dropped, ending consume loop");
                            break;
                        }
                    },
                    Err(error) => {
                        warn!(queue = %queue_name, %error, "consumer stream failed");
                        break;
                    },
                }
            }
        });

        Ok(rx)
    }
}

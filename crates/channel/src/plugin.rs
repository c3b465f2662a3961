use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    pipeworks_broker::Broker,
    pipeworks_config::{ChannelConfig, QueueTargets},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    envelope::{ExceptionLogEntry, LogEntry, RelayEnvelope},
    error::{Error, Result, validation},
    event::ChannelEvent,
};

/// Decoded events buffered toward the host before backpressure.
const EVENT_BUFFER: usize = 256;

/// Channel plugin: one broker connector, one immutable queue mapping.
///
/// Outbound operations are callable at any time, readiness only gates the
/// inbound event flow. Typical wiring:
///
/// ```no_run
/// # async fn example() {
/// use {pipeworks_broker::MemoryBroker, pipeworks_channel::ChannelPlugin};
///
/// let broker = std::sync::Arc::new(MemoryBroker::new());
/// let config = pipeworks_config::ChannelConfig {
///     input_pipe: "demo.pipe.channel".into(),
///     ..Default::default()
/// };
/// let (plugin, mut events) = ChannelPlugin::new(broker, &config);
/// let plugin = std::sync::Arc::new(plugin);
/// tokio::spawn({
///     let plugin = std::sync::Arc::clone(&plugin);
///     async move { plugin.run().await }
/// });
/// while let Some(event) = events.recv().await {
///     // Ready, then one Data per decoded inbound message.
/// }
/// # }
/// ```
pub struct ChannelPlugin {
    broker: Arc<dyn Broker>,
    targets: QueueTargets,
    plugin_id: String,
    events_tx: mpsc::Sender<ChannelEvent>,
    ready: AtomicBool,
    cancel: CancellationToken,
}

impl ChannelPlugin {
    /// Build a plugin and the event receiver the host consumes.
    #[must_use]
    pub fn new(
        broker: Arc<dyn Broker>,
        config: &ChannelConfig,
    ) -> (Self, mpsc::Receiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let plugin = Self {
            broker,
            targets: config.queue_targets(),
            plugin_id: config.plugin_id.clone(),
            events_tx,
            ready: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        };
        (plugin, events_rx)
    }

    /// Whether the inbound subscription has been confirmed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Token that stops [`run`](Self::run) when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to the input pipe and pump decoded deliveries to the event
    /// channel until cancelled, the subscription ends, or the host drops the
    /// event receiver.
    ///
    /// `Ready` is emitted after the broker confirms the subscription and
    /// before the first `Data` event, at most once per plugin lifetime.
    /// Malformed payloads are traced and skipped; they never stop the loop.
    pub async fn run(&self) -> Result<()> {
        let mut deliveries = self.broker.subscribe(&self.targets.input_pipe).await?;

        if !self.ready.swap(true, Ordering::SeqCst) {
            info!(queue = %self.targets.input_pipe, "inbound subscription confirmed");
            if self.events_tx.send(ChannelEvent::Ready).await.is_err() {
                debug!("event receiver dropped, ending inbound loop");
                return Ok(());
            }
        }

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!("channel plugin cancelled");
                    break;
                },
                delivery = deliveries.recv() => match delivery {
                    Some(raw) => {
                        if !self.handle_delivery(&raw).await {
                            debug!("event receiver dropped, ending inbound loop");
                            break;
                        }
                    },
                    None => {
                        warn!(queue = %self.targets.input_pipe, "inbound subscription ended");
                        break;
                    },
                },
            }
        }

        Ok(())
    }

    /// Decode one inbound payload and emit at most one `Data` event.
    ///
    /// Returns `false` once the host has dropped the event receiver.
    async fn handle_delivery(&self, raw: &[u8]) -> bool {
        match serde_json::from_slice::<serde_json::Value>(raw) {
            Ok(value) => self.events_tx.send(ChannelEvent::Data(value)).await.is_ok(),
            Err(error) => {
                // Malformed inbound data must stay observable without
                // crashing the pipeline; redelivery policy is the broker's.
                warn!(
                    queue = %self.targets.input_pipe,
                    %error,
                    "discarding inbound message that is not valid JSON"
                );
                true
            },
        }
    }

    /// Relay a command toward devices and/or device-type groups.
    ///
    /// Exactly one publish to the output pipe per successful call; identical
    /// calls produce distinct relay attempts.
    pub async fn relay_message(
        &self,
        message: &str,
        devices: Vec<String>,
        device_types: Vec<String>,
    ) -> Result<()> {
        if message.is_empty() {
            return Err(Error::validation(validation::EMPTY_RELAY_MESSAGE));
        }
        if devices.is_empty() && device_types.is_empty() {
            return Err(Error::validation(validation::MISSING_RELAY_TARGETS));
        }

        let envelope = RelayEnvelope {
            message: message.to_string(),
            devices,
            device_types,
        };
        let payload = serde_json::to_vec(&envelope)?;
        self.broker
            .publish(&self.targets.output_pipe, payload)
            .await?;
        Ok(())
    }

    /// Forward an operational log line to every configured logger queue.
    ///
    /// Zero configured queues is a silent success.
    pub async fn log(&self, data: &str) -> Result<()> {
        if data.is_empty() {
            return Err(Error::validation(validation::EMPTY_LOG_DATA));
        }
        let entry = LogEntry::new(&self.plugin_id, data);
        let payload = serde_json::to_vec(&entry)?;
        self.fan_out(&self.targets.loggers, payload).await
    }

    /// Forward an error to every configured exception logger queue.
    ///
    /// The error must render a non-empty message; zero configured queues is
    /// a silent success.
    pub async fn log_exception<E>(&self, err: &E) -> Result<()>
    where
        E: std::error::Error + ?Sized,
    {
        let entry = ExceptionLogEntry::from_error(&self.plugin_id, err);
        if entry.message.is_empty() {
            return Err(Error::validation(validation::INVALID_EXCEPTION));
        }
        let payload = serde_json::to_vec(&entry)?;
        self.fan_out(&self.targets.exception_loggers, payload)
            .await
    }

    /// Best-effort publish to each queue; failures are collected so one bad
    /// queue never suppresses delivery to the others.
    async fn fan_out(&self, queues: &[String], payload: Vec<u8>) -> Result<()> {
        let mut failures = Vec::new();
        for queue in queues {
            if let Err(error) = self.broker.publish(queue, payload.clone()).await {
                warn!(queue = %queue, %error, "log forward failed, trying remaining queues");
                failures.push((queue.clone(), error));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::LoggerFanout { failures })
        }
    }
}

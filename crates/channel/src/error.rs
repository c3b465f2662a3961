/// Crate-wide result type for plugin operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fixed caller-facing validation messages.
///
/// These literals are part of the plugin's public contract; hosts and the
/// pipeline tooling match on them verbatim.
pub mod validation {
    pub const EMPTY_RELAY_MESSAGE: &str = "Kindly specify the command/message to send";
    pub const MISSING_RELAY_TARGETS: &str = "Kindly specify the target device types or devices";
    pub const EMPTY_LOG_DATA: &str = "Kindly specify the data to log";
    pub const INVALID_EXCEPTION: &str = "Kindly specify a valid error to log";
}

/// Typed channel plugin errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller supplied invalid arguments to a public operation. Detected
    /// before any broker interaction; never retried.
    #[error("{message}")]
    Validation { message: &'static str },

    /// Broker-level failure, propagated unchanged from the connector.
    #[error(transparent)]
    Broker(#[from] pipeworks_broker::Error),

    /// One or more logger queues rejected a best-effort fan-out publish.
    /// Queues that accepted the publish keep their copy.
    #[error("log fan-out failed for queue(s): {}", failed_queue_names(failures))]
    LoggerFanout {
        failures: Vec<(String, pipeworks_broker::Error)>,
    },

    /// Envelope serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn validation(message: &'static str) -> Self {
        Self::Validation { message }
    }
}

fn failed_queue_names(failures: &[(String, pipeworks_broker::Error)]) -> String {
    failures
        .iter()
        .map(|(queue, _)| queue.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

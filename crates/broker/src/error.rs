use std::error::Error as StdError;

/// Crate-wide result type for broker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed broker connector errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Broker is unreachable or rejected the credentials.
    #[error("failed to connect to broker: {source}")]
    Connect {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A publish to a named queue was not accepted.
    #[error("failed to publish to queue `{queue}`: {source}")]
    Publish {
        queue: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A subscription to a named queue could not be established.
    #[error("failed to subscribe to queue `{queue}`: {source}")]
    Subscribe {
        queue: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The underlying connection or channel is gone.
    #[error("broker connection closed")]
    Closed,
}

impl Error {
    #[must_use]
    pub fn connect(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Connect {
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn publish(queue: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Publish {
            queue: queue.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn subscribe(
        queue: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Subscribe {
            queue: queue.into(),
            source: Box::new(source),
        }
    }
}

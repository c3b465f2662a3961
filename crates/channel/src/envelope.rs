//! Wire envelopes published toward the pipeline queues.

use {
    chrono::Utc,
    serde::{Deserialize, Serialize},
};

/// Relay command envelope, published to the output pipe.
///
/// Field names are the pipeline's JSON contract (`deviceTypes` camelCase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEnvelope {
    pub message: String,
    pub devices: Vec<String>,
    pub device_types: Vec<String>,
}

/// Operational log envelope, fanned out to the logger queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Originating plugin id.
    pub plugin: String,
    pub data: String,
    /// Publish-time UTC timestamp, epoch milliseconds.
    pub timestamp: i64,
}

impl LogEntry {
    #[must_use]
    pub fn new(plugin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            data: data.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Exception log envelope, fanned out to the exception logger queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionLogEntry {
    /// Originating plugin id.
    pub plugin: String,
    /// Error type name, taken from the static type `from_error` was called
    /// with. A trait object renders as the `dyn` type, not the concrete
    /// one; callers that want concrete names pass the error before erasing
    /// it.
    pub kind: String,
    pub message: String,
    /// Rendered source chain, outermost first. Absent for leaf errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    /// Publish-time UTC timestamp, epoch milliseconds.
    pub timestamp: i64,
}

impl ExceptionLogEntry {
    /// Capture an error's descriptive fields at publish time.
    #[must_use]
    pub fn from_error<E>(plugin: impl Into<String>, err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self {
            plugin: plugin.into(),
            kind: std::any::type_name::<E>().to_string(),
            message: err.to_string(),
            trace: render_chain(err),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Join the `source()` chain below `err` into one readable line.
fn render_chain<E>(err: &E) -> Option<String>
where
    E: std::error::Error + ?Sized,
{
    let mut parts = Vec::new();
    let mut cursor = err.source();
    while let Some(cause) = cursor {
        parts.push(cause.to_string());
        cursor = cause.source();
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(": "))
    }
}

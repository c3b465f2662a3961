//! Startup configuration validation.
//!
//! Produces diagnostics rather than hard failures so the host can decide
//! which findings are fatal (the CLI treats `Error` severity as fatal).

use secrecy::ExposeSecret;

use crate::schema::ChannelConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Config field the finding refers to, e.g. `"input_pipe"`.
    pub field: &'static str,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, field: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            field,
            message: message.into(),
        });
    }
}

/// Validate a startup configuration.
#[must_use]
pub fn validate(config: &ChannelConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.broker_url.expose_secret().is_empty() {
        result.push(
            Severity::Error,
            "broker_url",
            "broker URL is required (set `broker_url` or the BROKER variable)",
        );
    }
    if config.input_pipe.is_empty() {
        result.push(
            Severity::Error,
            "input_pipe",
            "input pipe queue name is required",
        );
    }
    if config.output_pipe.is_empty() {
        result.push(
            Severity::Warning,
            "output_pipe",
            "no output pipe configured; relay_message will fail at publish time",
        );
    }
    if config.loggers.is_empty() {
        result.push(
            Severity::Info,
            "loggers",
            "no logger queues configured; log forwarding is a no-op",
        );
    }
    if config.exception_loggers.is_empty() {
        result.push(
            Severity::Info,
            "exception_loggers",
            "no exception logger queues configured; exception forwarding is a no-op",
        );
    }

    result
}

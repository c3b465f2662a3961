//! Configuration loading, validation, and env substitution.
//!
//! Config files: `pipeworks.toml`, `pipeworks.yaml`, or `pipeworks.json`
//! Searched in `./` then `~/.config/pipeworks/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values, plus flat
//! environment overrides (`BROKER`, `INPUT_PIPE`, `OUTPUT_PIPE`, `PLUGIN_ID`,
//! `LOGGERS`, `EXCEPTION_LOGGERS`) for container deployments.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, discover_and_load, load_config},
    schema::{ChannelConfig, QueueTargets},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};

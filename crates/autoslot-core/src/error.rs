//! Core error types for autoslot-core.
//!
//! Each concern owns a thiserror enum; [`CoreError`] aggregates them so
//! the planner and the CLI can use a single `?`-friendly result type.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for autoslot-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persisted task state errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Calendar backend errors
    #[error("Calendar error: {0}")]
    Gateway(#[from] GatewayError),

    /// Slot placement errors
    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// The data directory could not be resolved or created
    #[error("Cannot prepare data directory: {0}")]
    DataDir(String),
}

/// Errors raised while reading or writing the task state file.
#[derive(Error, Debug)]
pub enum StateError {
    /// The file exists but could not be read or written
    #[error("Cannot access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON
    #[error("State file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record is structurally wrong
    #[error("Malformed record '{key}' in state file: {message}")]
    Malformed { key: String, message: String },
}

/// Errors surfaced by a [`crate::calendar::CalendarGateway`].
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The event does not exist (or was deleted) on the backend
    #[error("Event not found: {0}")]
    NotFound(String),

    /// Credentials missing or rejected
    #[error("Calendar authentication required: {0}")]
    Unauthorized(String),

    /// Backend asked us to slow down
    #[error("Calendar rate limited")]
    RateLimited,

    /// Any other non-success response
    #[error("Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Unexpected calendar response: {0}")]
    Decode(String),

    /// Local runtime setup failed
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A locally stored calendar could not be read or written
    #[error("Local calendar store error: {0}")]
    Storage(String),
}

impl GatewayError {
    /// Whether the error means the event is gone for good.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

/// Placement errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// No valid slot was found within the search horizon
    #[error("No free slot for task '{task}' within {horizon_days} days")]
    Infeasible { task: String, horizon_days: u32 },
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Task duration must be strictly positive
    #[error("Task '{name}' must have a positive duration, got {minutes} minutes")]
    NonPositiveDuration { name: String, minutes: i64 },

    /// An equal task is already queued, pending or scheduled
    #[error("Task '{0}' already exists")]
    DuplicateTask(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

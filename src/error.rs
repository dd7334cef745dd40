//! Error types for the telemetry delivery core.
//!
//! Every failure in this crate maps onto one of a small number of variants
//! with a fixed recovery story:
//!
//! - **Sample-local** (`QueueFull`, `NotReady`): absorbed where they occur,
//!   the affected sample is dropped and logged. Never escalates.
//! - **Session-level** (`AuthFailure`, `Transport`, `ConnectTimeout`): leave
//!   the node in the "no session" / "disconnected" sub-state until the next
//!   qualifying event (config change or link recovery).
//! - **Configuration** (`ConfigRejected`, `ConfigFile`, `ConfigParse`):
//!   surfaced to the caller that supplied the bad input; the stored
//!   configuration is never updated from a rejected value.
//!
//! Nothing here is fatal to the process. The only process-level exit path is
//! an external liveness watchdog, which this crate only feeds (see
//! [`crate::watchdog`]).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for node operations.
pub type Result<T, E = NodeError> = std::result::Result<T, E>;

/// Main error type for the delivery core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NodeError {
    /// The telemetry queue stayed full for the whole bounded wait.
    /// The sample was not enqueued.
    #[error("telemetry queue full after waiting {waited:?}")]
    QueueFull { waited: Duration },

    /// The consumer side of the telemetry queue is gone (shutdown).
    #[error("telemetry queue closed")]
    QueueClosed,

    /// No publish session exists, or the session reports disconnected.
    /// The sample that triggered this is dropped, not retried.
    #[error("publish session not ready: {reason}")]
    NotReady { reason: &'static str },

    /// The endpoint rejected our credentials. The session is left absent
    /// and rebuilt only after a configuration change or link recovery.
    #[error("endpoint rejected credentials: {reason}")]
    AuthFailure { reason: String },

    /// The underlying transport failed mid-session. Handled by the normal
    /// reconnect path.
    #[error("transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A connect or reconnect attempt exceeded its bounded wait.
    #[error("connect attempt timed out after {duration:?}")]
    ConnectTimeout { duration: Duration },

    /// A configuration update was rejected; the stored value is unchanged.
    #[error("rejected configuration value for '{key}': {reason}")]
    ConfigRejected { key: String, reason: String },

    /// The node configuration file could not be read.
    #[error("config file error: {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The node configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_yaml_ng::Error),

    /// I/O error from a socket the responder owns.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Returns whether a later attempt of the same operation may succeed
    /// without an external change (new config, link recovery).
    pub fn is_retryable(&self) -> bool {
        match self {
            NodeError::QueueFull { .. } => true,
            NodeError::NotReady { .. } => true,
            NodeError::Transport { .. } => true,
            NodeError::ConnectTimeout { .. } => true,
            NodeError::Io(_) => true,
            NodeError::QueueClosed => false,
            NodeError::AuthFailure { .. } => false,
            NodeError::ConfigRejected { .. } => false,
            NodeError::ConfigFile { .. } => false,
            NodeError::ConfigParse(_) => false,
        }
    }

    /// Helper constructor for `NotReady` drops.
    pub fn not_ready(reason: &'static str) -> Self {
        NodeError::NotReady { reason }
    }

    /// Helper constructor for credential rejections.
    pub fn auth_failure(reason: impl Into<String>) -> Self {
        NodeError::AuthFailure { reason: reason.into() }
    }

    /// Helper constructor for transport failures without a source error.
    pub fn transport(reason: impl Into<String>) -> Self {
        NodeError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport failures with a source error.
    pub fn transport_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        NodeError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for rejected configuration updates.
    pub fn config_rejected(key: impl Into<String>, reason: impl Into<String>) -> Self {
        NodeError::ConfigRejected { key: key.into(), reason: reason.into() }
    }

    /// Helper constructor for config file read failures.
    pub fn config_file(path: PathBuf, source: std::io::Error) -> Self {
        NodeError::ConfigFile { path, source }
    }
}

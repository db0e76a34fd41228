//! Error taxonomy of the Observing Block pipeline.
//!
//! - [`ConfigurationError`]: the configuration is unusable; raised before any
//!   remote call.
//! - [`ResolutionError`]: the catalog could not name exactly one object.
//! - [`RemoteError`]: the P2 store failed or refused a request.
//! - [`ObError`]: any of the above, plus illegal state-machine transitions.
//!
//! [`ObFailure`] attaches the OB label, run and [`SyncStep`] to an [`ObError`]
//! so an operator can tell a never-created OB from a created-but-not-updated
//! one.

use std::fmt;

use thiserror::Error;

pub use crate::p2::repository::RemoteError;

/// Problems with the observation configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Unknown observation mode '{mode}' (expected one of: {expected})")]
    UnknownMode { mode: String, expected: String },

    #[error("OB '{label}': missing required field '{field}'")]
    MissingField { label: String, field: String },

    #[error("OB '{label}': invalid value for '{field}': {reason}")]
    InvalidValue {
        label: String,
        field: String,
        reason: String,
    },

    #[error("Unable to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse configuration: {0}")]
    Parse(String),
}

impl ConfigurationError {
    pub fn missing(label: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            label: label.into(),
            field: field.into(),
        }
    }

    pub fn invalid(
        label: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            label: label.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failures of catalog name resolution.
///
/// Always fatal for the OB concerned; an ambiguous name is never narrowed
/// down automatically.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("Target '{name}' not found in catalog")]
    NotFound { name: String },

    #[error("Target '{name}' is ambiguous: {count} catalog entries match ({})", .candidates.join(", "))]
    Ambiguous {
        name: String,
        count: usize,
        candidates: Vec<String>,
    },

    #[error("Catalog query for '{name}' failed: {message}")]
    Catalog { name: String, message: String },

    #[error("Catalog record for '{name}' is unusable: {message}")]
    InvalidRecord { name: String, message: String },
}

impl ResolutionError {
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }
}

/// Any failure while preparing or synchronizing one Observing Block.
#[derive(Debug, Error)]
pub enum ObError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("OB '{label}': cannot {operation} while {state}")]
    InvalidState {
        label: String,
        operation: &'static str,
        state: String,
    },
}

impl ObError {
    /// True when the store refused a save because of a stale version.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::Remote(e) if e.is_version_conflict())
    }
}

/// Step of the per-OB pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStep {
    Configure,
    Resolve,
    Create,
    Update,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStep::Configure => "configure",
            SyncStep::Resolve => "resolve",
            SyncStep::Create => "create",
            SyncStep::Update => "update",
        };
        f.write_str(s)
    }
}

/// An [`ObError`] located in the pipeline.
#[derive(Debug, Error)]
#[error("OB '{label}' (run {run_id}) failed at {step}: {error}")]
pub struct ObFailure {
    pub label: String,
    pub run_id: String,
    pub step: SyncStep,
    #[source]
    pub error: ObError,
    /// The OB exists on the remote store, possibly incomplete
    pub remote_state: bool,
}

impl ObFailure {
    pub fn new(
        label: impl Into<String>,
        run_id: impl Into<String>,
        step: SyncStep,
        error: impl Into<ObError>,
    ) -> Self {
        Self {
            label: label.into(),
            run_id: run_id.into(),
            step,
            error: error.into(),
            remote_state: false,
        }
    }

    /// Mark whether the OB was created remotely before the failure.
    pub fn with_remote_state(mut self, remote_state: bool) -> Self {
        self.remote_state = remote_state;
        self
    }

    /// True if the OB exists on the remote store in some form.
    pub fn left_remote_state(&self) -> bool {
        self.remote_state
    }
}

//! Outcome tracking for one submission run.
//!
//! Every configured OB ends in exactly one [`ObOutcome`]; the report keeps
//! them in processing order together with a timestamped log.

use std::fmt;

use crate::api::ObId;
use crate::error::{ObFailure, SyncStep};

/// A single log entry with timestamp and message.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Final state of one OB.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum ObStatus {
    /// Created and updated on the store
    Sent { ob_id: ObId },
    /// Discarded by the operator before any remote call
    Cancelled,
    /// Aborted at `step`
    Failed {
        step: SyncStep,
        message: String,
        /// The OB may exist remotely in a partial state
        remote_state: bool,
    },
}

/// Outcome of one OB.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ObOutcome {
    pub label: String,
    pub status: ObStatus,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

/// Outcomes and log of one submission run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SubmissionReport {
    pub run_id: String,
    pub outcomes: Vec<ObOutcome>,
    pub logs: Vec<LogEntry>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl SubmissionReport {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            outcomes: Vec::new(),
            logs: Vec::new(),
            started_at: chrono::Utc::now(),
            completed_at: None,
        }
    }

    /// Add a log entry.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.logs.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level,
            message: message.into(),
        });
    }

    fn push(&mut self, label: &str, status: ObStatus) {
        self.outcomes.push(ObOutcome {
            label: label.to_string(),
            status,
            finished_at: chrono::Utc::now(),
        });
    }

    pub fn record_sent(&mut self, label: &str, ob_id: ObId) {
        self.log(
            LogLevel::Success,
            format!("OB {} sent to run {} (id {})", label, self.run_id, ob_id),
        );
        self.push(label, ObStatus::Sent { ob_id });
    }

    pub fn record_cancelled(&mut self, label: &str) {
        self.log(LogLevel::Warning, format!("OB {} was not sent to P2", label));
        self.push(label, ObStatus::Cancelled);
    }

    pub fn record_failure(&mut self, failure: &ObFailure) {
        self.log(LogLevel::Error, failure.to_string());
        self.push(
            &failure.label,
            ObStatus::Failed {
                step: failure.step,
                message: failure.error.to_string(),
                remote_state: failure.left_remote_state(),
            },
        );
    }

    /// Mark the run as finished.
    pub fn complete(&mut self) {
        self.completed_at = Some(chrono::Utc::now());
    }

    pub fn sent(&self) -> usize {
        self.count(|s| matches!(s, ObStatus::Sent { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, ObStatus::Cancelled))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ObStatus::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, predicate: impl Fn(&ObStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    pub fn outcome(&self, label: &str) -> Option<&ObOutcome> {
        self.outcomes.iter().find(|o| o.label == label)
    }
}

impl fmt::Display for SubmissionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match &outcome.status {
                ObStatus::Sent { ob_id } => writeln!(f, "  sent       {} (id {})", outcome.label, ob_id)?,
                ObStatus::Cancelled => writeln!(f, "  cancelled  {}", outcome.label)?,
                ObStatus::Failed {
                    step,
                    message,
                    remote_state,
                } => {
                    writeln!(f, "  failed     {} at {}: {}", outcome.label, step, message)?;
                    if *remote_state {
                        writeln!(f, "             check run {} for a partial OB", self.run_id)?;
                    }
                }
            }
        }
        write!(
            f,
            "{} sent, {} cancelled, {} failed",
            self.sent(),
            self.cancelled(),
            self.failed()
        )
    }
}

//! Service layer for submission orchestration.
//!
//! This module sits between the configuration, the catalog and the P2
//! repository. It drives every Observing Block through the submission
//! pipeline and records what happened to each one.

pub mod confirmation;
pub mod report;
pub mod submission;

#[cfg(feature = "cli")]
pub use confirmation::TerminalConfirm;
pub use confirmation::{AutoConfirm, ConfirmDecision, Confirmation, ScriptedConfirm};
pub use report::{LogEntry, LogLevel, ObOutcome, ObStatus, SubmissionReport};
pub use submission::Submission;

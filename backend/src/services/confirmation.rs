//! Operator confirmation before an OB is sent.
//!
//! Confirmation happens before `p2_create`; cancelling discards the OB with
//! no remote effect.

use std::sync::Mutex;

use crate::models::ObSummary;

/// Answer to a confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmDecision {
    Accept,
    Cancel,
}

/// Decides whether an OB is sent.
pub trait Confirmation: Send + Sync {
    fn confirm(&self, summary: &ObSummary) -> ConfirmDecision;
}

/// Accepts every OB (`--nogui`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirmation for AutoConfirm {
    fn confirm(&self, _summary: &ObSummary) -> ConfirmDecision {
        ConfirmDecision::Accept
    }
}

/// Replays fixed answers in order, then cancels. Records every summary seen.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: Mutex<Vec<ConfirmDecision>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answers: Vec<ConfirmDecision>) -> Self {
        let mut answers = answers;
        answers.reverse();
        Self {
            answers: Mutex::new(answers),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Labels of the OBs presented so far.
    pub fn seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Confirmation for ScriptedConfirm {
    fn confirm(&self, summary: &ObSummary) -> ConfirmDecision {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(summary.label.clone());
        self.answers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .unwrap_or(ConfirmDecision::Cancel)
    }
}

/// Interactive prompt on the controlling terminal.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirm;

#[cfg(feature = "cli")]
impl Confirmation for TerminalConfirm {
    fn confirm(&self, summary: &ObSummary) -> ConfirmDecision {
        use console::{style, Term};

        let term = Term::stderr();
        let shown = term
            .write_line("")
            .and_then(|_| term.write_line(&style(summary.to_string()).cyan().to_string()))
            .and_then(|_| term.write_str("Send to P2? [y/N]: "));
        if let Err(e) = shown {
            log::warn!("Cannot prompt for OB {}: {}", summary.label, e);
            return ConfirmDecision::Cancel;
        }

        match term.read_line() {
            Ok(answer) if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") => {
                ConfirmDecision::Accept
            }
            Ok(_) => ConfirmDecision::Cancel,
            Err(e) => {
                log::warn!("Cannot read confirmation for OB {}: {}", summary.label, e);
                ConfirmDecision::Cancel
            }
        }
    }
}

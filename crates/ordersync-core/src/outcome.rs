//! Best-effort aggregation of one reconciliation pass.
//!
//! Independent mutation steps each leave one [`StepRecord`]. A failed step does
//! not stop later ones; the pass as a whole is failed if any record failed.
//! Advisory [`Warning`]s are kept apart from failures so an operator can tell
//! "will self-heal next run" from "needs manual action".

use std::fmt;

use crate::error::ReconcileError;

/// Result of one attempted mutation (or local validation standing in for one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Attribute path the step relates to, e.g. `mount_points["/data"]`.
    pub attribute: String,
    /// Remote operation name or local check.
    pub action: String,
    pub result: Result<(), ReconcileError>,
}

impl StepRecord {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&ReconcileError> {
        self.result.as_ref().err()
    }
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(()) => write!(f, "{}: {} ok", self.attribute, self.action),
            Err(e) => write!(f, "{}: {e}", self.attribute),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub attribute: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.attribute, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    steps: Vec<StepRecord>,
    warnings: Vec<Warning>,
}

impl ReconciliationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        attribute: impl Into<String>,
        action: impl Into<String>,
        result: Result<(), ReconcileError>,
    ) {
        self.steps.push(StepRecord {
            attribute: attribute.into(),
            action: action.into(),
            result,
        });
    }

    pub fn succeeded(&mut self, attribute: impl Into<String>, action: impl Into<String>) {
        self.record(attribute, action, Ok(()));
    }

    pub fn failed(
        &mut self,
        attribute: impl Into<String>,
        action: impl Into<String>,
        error: ReconcileError,
    ) {
        self.record(attribute, action, Err(error));
    }

    pub fn warn(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Warning {
            attribute: attribute.into(),
            message: message.into(),
        });
    }

    /// Appends another outcome, preserving order.
    pub fn merge(&mut self, other: ReconciliationOutcome) {
        self.steps.extend(other.steps);
        self.warnings.extend(other.warnings);
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn errors(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| !s.is_success())
    }

    pub fn has_errors(&self) -> bool {
        self.steps.iter().any(|s| !s.is_success())
    }

    /// Whether a pass-level failure (e.g. not deletable) was recorded.
    pub fn has_pass_fatal(&self) -> bool {
        self.errors()
            .filter_map(StepRecord::error)
            .any(ReconcileError::is_pass_fatal)
    }

    /// Number of steps that reached the remote side or a local check.
    pub fn attempted(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.warnings.is_empty()
    }
}

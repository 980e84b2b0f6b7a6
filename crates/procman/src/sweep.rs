//! Results of aggregate operations across the registry

use crate::error::Error;
use crate::lifecycle::Action;
use std::fmt;

/// One entry that failed during a sweep
#[derive(Debug)]
pub struct SweepFailure {
    /// Entry name
    pub name: String,
    /// What went wrong
    pub error: Error,
}

impl fmt::Display for SweepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error on process '{}': {}", self.name, self.error)
    }
}

/// Outcome of a start/stop/kill sweep
///
/// Sweeps continue past failures. Every failure is kept, in sweep order, and
/// [`SweepReport::first`] gives the first one.
#[derive(Debug)]
pub struct SweepReport {
    action: Action,
    succeeded: Vec<String>,
    skipped: Vec<String>,
    failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub(crate) fn new(action: Action) -> Self {
        Self {
            action,
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub(crate) fn record_success(&mut self, name: String) {
        self.succeeded.push(name);
    }

    pub(crate) fn record_skipped(&mut self, name: String) {
        self.skipped.push(name);
    }

    pub(crate) fn record_failure(&mut self, name: String, error: Error) {
        self.failures.push(SweepFailure { name, error });
    }

    /// The action applied to each entry
    pub fn action(&self) -> Action {
        self.action
    }

    /// Entries the action succeeded on
    pub fn succeeded(&self) -> &[String] {
        &self.succeeded
    }

    /// Entries already in the target state
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Every failure, in sweep order
    pub fn failures(&self) -> &[SweepFailure] {
        &self.failures
    }

    /// The first entry that failed
    pub fn first(&self) -> Option<&SweepFailure> {
        self.failures.first()
    }

    /// True when nothing failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Collapse to the first failure, dropping the rest
    pub fn into_result(self) -> Result<(), SweepFailure> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

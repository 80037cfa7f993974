//! Per-unit outcomes of batch operations.

use std::fmt;
use std::path::PathBuf;

/// Result of acquiring or processing one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodOutcome {
    /// Artifact written (or already present).
    Success(PathBuf),
    /// Nothing available for this unit; not an error.
    Skipped(String),
    /// The unit failed; other units were still attempted.
    Fatal(String),
}

impl PeriodOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PeriodOutcome::Success(_))
    }
}

/// Outcomes of a batch, in the order units were attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<U> {
    pub outcomes: Vec<(U, PeriodOutcome)>,
}

impl<U> Default for BatchReport<U> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }
}

impl<U> BatchReport<U> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: U, outcome: PeriodOutcome) {
        self.outcomes.push((unit, outcome));
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, PeriodOutcome::Success(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, PeriodOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PeriodOutcome::Fatal(_)))
    }

    /// True when no unit failed.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome(&self, unit: &U) -> Option<&PeriodOutcome>
    where
        U: PartialEq,
    {
        self.outcomes.iter().find(|(u, _)| u == unit).map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&PeriodOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

impl<U> fmt::Display for BatchReport<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.succeeded(),
            self.skipped(),
            self.failed()
        )
    }
}

//! Per-target outcomes and their aggregation.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::executor::TabularResult;

/// What one execution against one target produced
#[derive(Debug, Clone, Serialize)]
pub enum OutcomeKind {
    /// Tabular payload returned by the executor
    Success(TabularResult),
    /// Error text from a failed or timed-out execution
    Failed(String),
    /// Deliberately cancelled before producing a result; distinct from
    /// failure, not an error condition
    Cancelled,
}

/// The recorded result of one execution against one target
///
/// Immutable once produced. Belongs to exactly one aggregated result and
/// references its target by name, so removing the target from the registry
/// later does not invalidate it.
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    /// Target name
    pub target: String,
    pub kind: OutcomeKind,
    /// When the execution was launched
    pub started_at: SystemTime,
    /// How long it ran
    pub duration: Duration,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.kind, OutcomeKind::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.kind, OutcomeKind::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, OutcomeKind::Cancelled)
    }

    /// Tabular payload, for successful outcomes
    pub fn table(&self) -> Option<&TabularResult> {
        match &self.kind {
            OutcomeKind::Success(table) => Some(table),
            _ => None,
        }
    }

    /// Error text, for failed outcomes
    pub fn error(&self) -> Option<&str> {
        match &self.kind {
            OutcomeKind::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Derived summary counts over one aggregated result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Rows across all successful outcomes
    pub total_rows: usize,
}

/// The complete set of outcomes for one dispatched request
///
/// Storage is keyed by target name; iteration order is lexicographic by
/// name regardless of completion order, so repeated runs present stably.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedResult {
    outcomes: BTreeMap<String, TargetOutcome>,
}

impl AggregatedResult {
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = TargetOutcome>) -> Self {
        Self {
            outcomes: outcomes
                .into_iter()
                .map(|o| (o.target.clone(), o))
                .collect(),
        }
    }

    /// Detail lookup by target name
    pub fn get(&self, target: &str) -> Option<&TargetOutcome> {
        self.outcomes.get(target)
    }

    /// Outcomes in lexicographic target-name order
    pub fn outcomes(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.values()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Compute summary counts. Pure; does not mutate the result.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for outcome in self.outcomes.values() {
            match &outcome.kind {
                OutcomeKind::Success(table) => {
                    summary.succeeded += 1;
                    summary.total_rows += table.row_count();
                }
                OutcomeKind::Failed(_) => summary.failed += 1,
                OutcomeKind::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }
}

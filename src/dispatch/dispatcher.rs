//! Concurrent fan-out of one query across a selected set of targets.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use dashmap::DashMap;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DispatchConfig;
use crate::executor::QueryExecutor;
use crate::metrics::metrics;
use crate::registry::{Registry, RegistryError, Target};

use super::outcome::{AggregatedResult, OutcomeKind, TargetOutcome};

/// One query and the target names to run it against. Ephemeral.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub sql: String,
    pub targets: Vec<String>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>, targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            sql: sql.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Structural dispatch errors, rejected before any execution starts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown target '{0}'")]
    UnknownTarget(String),
}

/// Fans one request out across its targets, one concurrent execution each.
///
/// Failure isolation: an error or timeout on one target yields a failed
/// outcome for that target only and never cancels or taints siblings.
/// `dispatch` returns only once every requested target has produced
/// exactly one outcome, including under cancellation.
pub struct Dispatcher {
    registry: Arc<Registry>,
    executor: Arc<dyn QueryExecutor>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        executor: Arc<dyn QueryExecutor>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            executor,
            config,
        }
    }

    /// Execute one request against all its targets concurrently
    ///
    /// Duplicate names are collapsed. Unknown names fail the whole call
    /// before anything is launched. The cancellation token applies to the
    /// whole request: finished outcomes are kept, in-flight executions are
    /// asked to cancel, and not-yet-started ones are recorded as cancelled.
    pub async fn dispatch(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregatedResult, DispatchError> {
        let names: BTreeSet<String> = request.targets.iter().cloned().collect();

        // Resolve every name against one registry snapshot, fail fast
        let resolved: Vec<Target> = self
            .registry
            .select(names.iter().map(String::as_str))
            .map_err(|err| match err {
                RegistryError::UnknownTarget(name) => DispatchError::UnknownTarget(name),
                other => DispatchError::UnknownTarget(other.to_string()),
            })?;

        metrics().record_dispatch(resolved.len());
        debug!(targets = resolved.len(), "Dispatching query");

        // One slot per target, written exactly once, never read by another
        // writer; the key set is fixed up front.
        let outcomes: Arc<DashMap<String, TargetOutcome>> = Arc::new(DashMap::new());
        let mut executions = JoinSet::new();
        for target in resolved {
            let executor = Arc::clone(&self.executor);
            let sql = request.sql.clone();
            let timeout = self.config.query_timeout();
            let token = cancel.child_token();
            let outcomes = Arc::clone(&outcomes);
            executions.spawn(async move {
                let outcome = run_one(executor, target, &sql, timeout, token).await;
                metrics().observe_outcome(&outcome);
                outcomes.insert(outcome.target.clone(), outcome);
            });
        }

        // Wait for all: every execution runs to completion (success,
        // failure or cancellation) before the aggregate is complete.
        while let Some(joined) = executions.join_next().await {
            if joined.is_err() {
                warn!("Execution task aborted");
            }
        }

        // Completeness backstop: a target whose task died without writing
        // its slot still gets exactly one outcome.
        for name in names {
            outcomes.entry(name.clone()).or_insert_with(|| TargetOutcome {
                target: name,
                kind: OutcomeKind::Failed("execution task aborted".to_string()),
                started_at: SystemTime::now(),
                duration: Default::default(),
            });
        }

        let result = AggregatedResult::from_outcomes(
            outcomes.iter().map(|entry| entry.value().clone()),
        );
        let summary = result.summary();
        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Dispatch complete"
        );
        Ok(result)
    }
}

/// Run one execution, converting every failure mode into an outcome
async fn run_one(
    executor: Arc<dyn QueryExecutor>,
    target: Target,
    sql: &str,
    timeout: std::time::Duration,
    token: CancellationToken,
) -> TargetOutcome {
    let started_at = SystemTime::now();
    let begin = Instant::now();

    // Request already cancelled before this execution started
    if token.is_cancelled() {
        return TargetOutcome {
            target: target.name,
            kind: OutcomeKind::Cancelled,
            started_at,
            duration: begin.elapsed(),
        };
    }

    let kind = tokio::select! {
        _ = token.cancelled() => {
            debug!(target = %target.name, "Execution cancelled");
            OutcomeKind::Cancelled
        }
        timed = tokio::time::timeout(
            timeout,
            executor.execute(&target.descriptor, sql, timeout, &token),
        ) => match timed {
            Ok(Ok(table)) => OutcomeKind::Success(table),
            Ok(Err(e)) => {
                warn!(target = %target.name, error = %e, "Execution failed");
                OutcomeKind::Failed(e.to_string())
            }
            Err(_) => {
                warn!(target = %target.name, timeout_ms = timeout.as_millis() as u64, "Execution timed out");
                OutcomeKind::Failed(format!("query timed out after {}ms", timeout.as_millis()))
            }
        }
    };

    TargetOutcome {
        target: target.name,
        kind,
        started_at,
        duration: begin.elapsed(),
    }
}

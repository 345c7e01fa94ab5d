//! Query executor contract.
//!
//! The engine never speaks a wire protocol itself; the surrounding system
//! supplies an executor that opens a connection to one target, runs a
//! command and returns tabular data or an error. Implementations must be
//! safe to invoke concurrently for different targets and must not leak
//! per-invocation state between calls.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::registry::TargetDescriptor;

/// Rows and columns returned by one execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Failure modes an executor may report
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("execution failed: {0}")]
    Execute(String),
}

/// Capability to run one command against one target
///
/// The engine additionally wraps every call in its own timeout, so a
/// misbehaving implementation cannot stall a fan-out past its bounds.
/// The cancellation token is a request to abort early; honoring it is
/// best effort.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        target: &TargetDescriptor,
        sql: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<TabularResult, ExecError>;
}

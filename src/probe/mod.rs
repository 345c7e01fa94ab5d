//! Endpoint prober: bounded-time connectivity and version check.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::executor::QueryExecutor;
use crate::registry::{TargetDescriptor, TargetStatus};

/// Classified outcome of one probe
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub status: TargetStatus,
    /// Round-trip latency, set on success only
    pub latency: Option<Duration>,
    /// Server version string, when the probe command returned one
    pub version: Option<String>,
    /// Error text, set on failure only
    pub error: Option<String>,
}

/// Probes one target by running a trivial round-trip command through the
/// query executor and timing it.
///
/// `probe` never fails across its boundary: connection errors, command
/// errors and timeouts all resolve to a populated `ProbeResult`, because
/// this call runs inside a background loop that must never crash.
pub struct Prober {
    executor: Arc<dyn QueryExecutor>,
    command: String,
}

impl Prober {
    pub fn new(executor: Arc<dyn QueryExecutor>, command: impl Into<String>) -> Self {
        Self {
            executor,
            command: command.into(),
        }
    }

    /// Run one probe with the given per-probe timeout
    pub async fn probe(&self, target: &TargetDescriptor, timeout: Duration) -> ProbeResult {
        let cancel = CancellationToken::new();
        let begin = Instant::now();

        let result = tokio::time::timeout(
            timeout,
            self.executor.execute(target, &self.command, timeout, &cancel),
        )
        .await;

        match result {
            Ok(Ok(table)) => {
                let latency = begin.elapsed();
                let version = table.rows.first().and_then(|row| row.first()).cloned();
                debug!(host = %target.host, latency_ms = latency.as_millis() as u64, "Probe succeeded");
                ProbeResult {
                    status: TargetStatus::Online,
                    latency: Some(latency),
                    version,
                    error: None,
                }
            }
            Ok(Err(e)) => {
                debug!(host = %target.host, error = %e, "Probe failed");
                ProbeResult {
                    status: TargetStatus::Offline,
                    latency: None,
                    version: None,
                    error: Some(e.to_string()),
                }
            }
            Err(_) => {
                debug!(host = %target.host, timeout_ms = timeout.as_millis() as u64, "Probe timed out");
                ProbeResult {
                    status: TargetStatus::Offline,
                    latency: None,
                    version: None,
                    error: Some(format!("probe timed out after {}ms", timeout.as_millis())),
                }
            }
        }
    }
}

//! Prometheus metrics for the dispatch and health-monitoring engine
//!
//! The embedding application exposes these however it likes (HTTP
//! endpoint, push, logs); the engine only records.

use std::sync::OnceLock;
use std::time::Duration;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry};

use crate::dispatch::TargetOutcome;
use crate::registry::{RegistryStats, TargetStatus};

/// Global metrics registry
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Engine metrics collection
pub struct Metrics {
    /// Registry for all metrics
    pub registry: Registry,

    // Probe metrics
    /// Probe results by resulting status
    pub probes_total: IntCounterVec,
    /// Successful probe round-trip latency (in seconds)
    pub probe_duration_seconds: Histogram,

    // Health cycle metrics
    /// Completed health cycles
    pub health_cycles_total: IntCounter,
    /// Current target counts by status
    pub health_targets: IntGaugeVec,

    // Dispatch metrics
    /// Dispatch requests accepted
    pub dispatches_total: IntCounter,
    /// Per-target outcomes by kind
    pub dispatch_outcomes_total: IntCounterVec,
    /// Per-target execution duration (in seconds)
    pub query_duration_seconds: Histogram,
}

impl Metrics {
    /// Create a new metrics collection
    pub fn new() -> Self {
        let registry = Registry::new();

        let probes_total = IntCounterVec::new(
            Opts::new("hydra_probes_total", "Probe results by resulting status"),
            &["status"],
        )
        .unwrap();

        let probe_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "hydra_probe_duration_seconds",
            "Successful probe round-trip latency in seconds",
        ))
        .unwrap();

        let health_cycles_total = IntCounter::new(
            "hydra_health_cycles_total",
            "Total number of completed health cycles",
        )
        .unwrap();

        let health_targets = IntGaugeVec::new(
            Opts::new("hydra_health_targets", "Current target counts by status"),
            &["status"],
        )
        .unwrap();

        let dispatches_total = IntCounter::new(
            "hydra_dispatches_total",
            "Total number of dispatch requests accepted",
        )
        .unwrap();

        let dispatch_outcomes_total = IntCounterVec::new(
            Opts::new(
                "hydra_dispatch_outcomes_total",
                "Per-target dispatch outcomes by kind",
            ),
            &["outcome"],
        )
        .unwrap();

        let query_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "hydra_query_duration_seconds",
            "Per-target query execution duration in seconds",
        ))
        .unwrap();

        registry.register(Box::new(probes_total.clone())).unwrap();
        registry.register(Box::new(probe_duration_seconds.clone())).unwrap();
        registry.register(Box::new(health_cycles_total.clone())).unwrap();
        registry.register(Box::new(health_targets.clone())).unwrap();
        registry.register(Box::new(dispatches_total.clone())).unwrap();
        registry.register(Box::new(dispatch_outcomes_total.clone())).unwrap();
        registry.register(Box::new(query_duration_seconds.clone())).unwrap();

        Self {
            registry,
            probes_total,
            probe_duration_seconds,
            health_cycles_total,
            health_targets,
            dispatches_total,
            dispatch_outcomes_total,
            query_duration_seconds,
        }
    }

    /// Record one probe result
    pub fn observe_probe(&self, status: TargetStatus, latency: Option<Duration>) {
        self.probes_total
            .with_label_values(&[status_label(status)])
            .inc();
        if let Some(latency) = latency {
            self.probe_duration_seconds.observe(latency.as_secs_f64());
        }
    }

    /// Record a completed cycle and the resulting status gauge values
    pub fn record_cycle(&self, stats: &RegistryStats) {
        self.health_cycles_total.inc();
        self.health_targets
            .with_label_values(&["online"])
            .set(stats.online as i64);
        self.health_targets
            .with_label_values(&["offline"])
            .set(stats.offline as i64);
        self.health_targets
            .with_label_values(&["unknown"])
            .set(stats.unknown as i64);
        self.health_targets
            .with_label_values(&["warning"])
            .set(stats.warning as i64);
    }

    /// Record an accepted dispatch request
    pub fn record_dispatch(&self, _targets: usize) {
        self.dispatches_total.inc();
    }

    /// Record one per-target outcome
    pub fn observe_outcome(&self, outcome: &TargetOutcome) {
        let label = if outcome.is_success() {
            "success"
        } else if outcome.is_cancelled() {
            "cancelled"
        } else {
            "failed"
        };
        self.dispatch_outcomes_total.with_label_values(&[label]).inc();
        self.query_duration_seconds
            .observe(outcome.duration.as_secs_f64());
    }

    /// Gather all metric families for encoding
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn status_label(status: TargetStatus) -> &'static str {
    match status {
        TargetStatus::Online => "online",
        TargetStatus::Offline => "offline",
        TargetStatus::Unknown => "unknown",
        TargetStatus::Warning => "warning",
    }
}

//! Health monitor: recurring concurrent probe cycles over all targets.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::executor::QueryExecutor;
use crate::metrics::metrics;
use crate::probe::Prober;
use crate::registry::{Registry, TargetHealth, TargetStatus};

/// Full health state of every target after one completed cycle
///
/// One message per cycle is published on the broadcast channel, replacing
/// per-target callbacks: subscribers always see a complete, consistent
/// snapshot and no ordering ambiguity between individual updates.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// Monotonic cycle number
    pub cycle: u64,
    /// Health state per target, keyed by name
    pub entries: BTreeMap<String, TargetHealth>,
}

/// Drives the per-target state machine `Unknown -> {Online, Offline}`.
///
/// Every cycle probes all registered targets concurrently (one task per
/// target, each bounded by the per-probe timeout), publishes the whole
/// batch atomically into the registry and emits one snapshot. At most one
/// cycle is ever in flight; an overlapping `trigger` is dropped.
pub struct HealthMonitor {
    registry: Arc<Registry>,
    prober: Arc<Prober>,
    config: MonitorConfig,
    /// Single-flight guard for cycles
    cycle_active: AtomicBool,
    cycles_completed: AtomicU64,
    /// Token of the currently running loop, if any
    loop_token: Mutex<Option<CancellationToken>>,
    snapshot_tx: broadcast::Sender<HealthSnapshot>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<Registry>,
        executor: Arc<dyn QueryExecutor>,
        config: MonitorConfig,
    ) -> Self {
        let prober = Arc::new(Prober::new(executor, config.probe_command.clone()));
        let (snapshot_tx, _) = broadcast::channel(16);
        Self {
            registry,
            prober,
            config,
            cycle_active: AtomicBool::new(false),
            cycles_completed: AtomicU64::new(0),
            loop_token: Mutex::new(None),
            snapshot_tx,
        }
    }

    /// Subscribe to per-cycle health snapshots
    pub fn subscribe(&self) -> broadcast::Receiver<HealthSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Number of cycles completed so far
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::SeqCst)
    }

    /// Begin the recurring cycle loop
    ///
    /// Calling `start` while a loop is running replaces it: the previous
    /// loop is cancelled first. The first cycle runs immediately.
    pub fn start(self: &Arc<Self>, interval: std::time::Duration) {
        if !self.config.enabled {
            info!("Health monitoring is disabled");
            return;
        }

        let token = CancellationToken::new();
        {
            let mut guard = self.loop_token.lock();
            if let Some(previous) = guard.take() {
                previous.cancel();
            }
            *guard = Some(token.clone());
        }

        let monitor = Arc::clone(self);
        info!(interval_ms = interval.as_millis() as u64, "Health monitor started");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Health loop cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !monitor.run_cycle_guarded().await {
                            debug!("Cycle still in flight, tick skipped");
                        }
                    }
                }
            }
        });
    }

    /// Cancel the recurring loop
    ///
    /// In-flight probes finish; no new cycle is scheduled. Idempotent:
    /// calling `stop` twice, or before `start`, is a no-op.
    pub fn stop(&self) {
        if let Some(token) = self.loop_token.lock().take() {
            token.cancel();
            info!("Health monitor stopped");
        }
    }

    /// Run one cycle immediately, independent of the schedule
    ///
    /// Returns false when a cycle is already in flight; the overlapping
    /// request is dropped, not queued.
    pub async fn trigger(&self) -> bool {
        self.run_cycle_guarded().await
    }

    async fn run_cycle_guarded(&self) -> bool {
        if self
            .cycle_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.run_cycle().await;
        self.cycle_active.store(false, Ordering::SeqCst);
        true
    }

    /// One full pass: snapshot, concurrent probes, atomic publication,
    /// one snapshot broadcast.
    async fn run_cycle(&self) {
        let targets = self.registry.list();
        let probe_timeout = self.config.probe_timeout();

        let mut probes = JoinSet::new();
        for target in targets {
            let prober = Arc::clone(&self.prober);
            probes.spawn(async move {
                let result = prober.probe(&target.descriptor, probe_timeout).await;
                (target.name, result)
            });
        }

        let mut updates = BTreeMap::new();
        while let Some(joined) = probes.join_next().await {
            let Ok((name, probe)) = joined else {
                // A probe task never panics; a lost slot is re-probed next cycle
                warn!("Probe task aborted");
                continue;
            };
            metrics().observe_probe(probe.status, probe.latency);
            updates.insert(
                name,
                TargetHealth {
                    status: probe.status,
                    latency: probe.latency,
                    version: probe.version,
                    last_error: probe.error,
                    last_check: Some(SystemTime::now()),
                },
            );
        }

        let probed = updates.len();
        let changes = self.registry.apply_health(updates);
        for change in &changes {
            if change.to == TargetStatus::Offline {
                warn!(target = %change.target, from = ?change.from, to = ?change.to, "Target status changed");
            } else {
                info!(target = %change.target, from = ?change.from, to = ?change.to, "Target status changed");
            }
        }

        metrics().record_cycle(&self.registry.stats());

        let cycle = self.cycles_completed.fetch_add(1, Ordering::SeqCst) + 1;
        let entries = self
            .registry
            .list()
            .into_iter()
            .map(|t| (t.name, t.health))
            .collect();
        // No subscribers is fine
        let _ = self.snapshot_tx.send(HealthSnapshot { cycle, entries });

        debug!(cycle, probed, changed = changes.len(), "Health cycle complete");
    }
}

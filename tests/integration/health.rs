//! Health monitor cycles: concurrency bounds, single-flight, status flips.

use std::sync::Arc;
use std::time::Duration;

use hydra::config::MonitorConfig;
use hydra::health::HealthMonitor;
use hydra::registry::TargetStatus;

use crate::{setup, Script};

fn monitor_config(probe_timeout: Duration) -> MonitorConfig {
    MonitorConfig {
        probe_timeout_ms: probe_timeout.as_millis() as u64,
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_cycle_classifies_all_targets_within_one_probe_timeout() {
    // A reachable, B unreachable, C times out
    let (registry, executor) = setup(vec![
        ("a", Script::ok(1)),
        ("b", Script::Fail("no route to host")),
        ("c", Script::Hang),
    ]);
    let monitor = Arc::new(HealthMonitor::new(
        Arc::clone(&registry),
        executor,
        monitor_config(Duration::from_secs(2)),
    ));
    let mut snapshots = monitor.subscribe();

    let begin = tokio::time::Instant::now();
    assert!(monitor.trigger().await);

    // Bounded by the probe timeout, not 3x the probe timeout
    assert!(begin.elapsed() < Duration::from_secs(3));

    assert_eq!(registry.get("a").unwrap().status(), TargetStatus::Online);
    assert_eq!(registry.get("b").unwrap().status(), TargetStatus::Offline);
    assert_eq!(registry.get("c").unwrap().status(), TargetStatus::Offline);
    assert!(registry
        .get("b")
        .unwrap()
        .health
        .last_error
        .unwrap()
        .contains("no route"));
    assert!(registry
        .get("c")
        .unwrap()
        .health
        .last_error
        .unwrap()
        .contains("timed out"));

    // One "cycle complete" notification carrying the full snapshot
    let snapshot = snapshots.recv().await.unwrap();
    assert_eq!(snapshot.cycle, 1);
    assert_eq!(snapshot.entries.len(), 3);
    assert!(snapshot.entries["a"].is_online());
}

#[tokio::test(start_paused = true)]
async fn test_probes_within_a_cycle_run_concurrently() {
    let (registry, executor) = setup(vec![
        ("a", Script::ok_after(1, Duration::from_millis(200))),
        ("b", Script::ok_after(1, Duration::from_millis(200))),
        ("c", Script::ok_after(1, Duration::from_millis(200))),
    ]);
    let monitor = Arc::new(HealthMonitor::new(
        registry,
        executor.clone(),
        monitor_config(Duration::from_secs(2)),
    ));

    let begin = tokio::time::Instant::now();
    monitor.trigger().await;

    assert_eq!(executor.max_active(), 3);
    assert!(begin.elapsed() < Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn test_trigger_while_cycle_in_flight_is_dropped() {
    let (registry, executor) = setup(vec![("slow", Script::Hang)]);
    let monitor = Arc::new(HealthMonitor::new(
        registry,
        executor.clone(),
        monitor_config(Duration::from_secs(5)),
    ));

    let first = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.trigger().await })
    };

    // Let the first cycle get in flight, then try to overlap it
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!monitor.trigger().await, "second cycle ran concurrently");

    assert!(first.await.unwrap());
    assert_eq!(monitor.cycles_completed(), 1);
    // Exactly one probe batch reached the executor
    assert_eq!(executor.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recurring_cycles_until_stopped() {
    let (registry, executor) = setup(vec![("alpha", Script::ok(1))]);
    let monitor = Arc::new(HealthMonitor::new(
        registry,
        executor,
        monitor_config(Duration::from_secs(1)),
    ));

    monitor.start(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(3500)).await;
    let after_run = monitor.cycles_completed();
    assert!(after_run >= 3, "expected at least 3 cycles, got {after_run}");

    // stop() cancels the schedule; no further cycles
    monitor.stop();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(monitor.cycles_completed(), after_run);

    // Idempotent
    monitor.stop();
}

#[tokio::test(start_paused = true)]
async fn test_status_flips_as_target_behavior_changes() {
    let (registry, executor) = setup(vec![("alpha", Script::ok(1))]);
    let monitor = Arc::new(HealthMonitor::new(
        Arc::clone(&registry),
        executor.clone(),
        monitor_config(Duration::from_secs(2)),
    ));

    assert_eq!(registry.get("alpha").unwrap().status(), TargetStatus::Unknown);

    monitor.trigger().await;
    assert_eq!(registry.get("alpha").unwrap().status(), TargetStatus::Online);
    assert!(registry.get("alpha").unwrap().health.latency.is_some());

    // Target goes down: one cycle flips it, no damping window
    executor.set_script("alpha", Script::Fail("connection reset"));
    monitor.trigger().await;
    assert_eq!(registry.get("alpha").unwrap().status(), TargetStatus::Offline);

    // And back up
    executor.set_script("alpha", Script::ok(1));
    monitor.trigger().await;
    assert_eq!(registry.get("alpha").unwrap().status(), TargetStatus::Online);
}

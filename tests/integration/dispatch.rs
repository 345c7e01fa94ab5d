//! Dispatcher fan-out, isolation, ordering and cancellation behavior.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use hydra::config::DispatchConfig;
use hydra::dispatch::{Dispatcher, QueryRequest};

use crate::{setup, Script};

fn dispatch_config(timeout: Duration) -> DispatchConfig {
    DispatchConfig {
        query_timeout_ms: timeout.as_millis() as u64,
    }
}

#[tokio::test]
async fn test_every_target_yields_exactly_one_outcome() {
    let (registry, executor) = setup(vec![
        ("alpha", Script::ok(2)),
        ("beta", Script::Fail("connection refused")),
        ("gamma", Script::ok(1)),
        ("delta", Script::Fail("login failed")),
    ]);
    let dispatcher = Dispatcher::new(
        registry,
        executor,
        dispatch_config(Duration::from_secs(30)),
    );

    let request = QueryRequest::new("SELECT * FROM sys.tables", ["alpha", "beta", "gamma", "delta"]);
    let result = dispatcher
        .dispatch(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    let summary = result.summary();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.cancelled, 0);
    assert_eq!(summary.total_rows, 3);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_targets_cost_one_timeout_not_their_sum() {
    let (registry, executor) = setup(vec![
        ("alpha", Script::Hang),
        ("beta", Script::Hang),
        ("gamma", Script::Hang),
    ]);
    let dispatcher = Dispatcher::new(
        registry,
        executor.clone(),
        dispatch_config(Duration::from_secs(1)),
    );

    let begin = tokio::time::Instant::now();
    let request = QueryRequest::new("SELECT 1", ["alpha", "beta", "gamma"]);
    let result = dispatcher
        .dispatch(&request, &CancellationToken::new())
        .await
        .unwrap();

    // All three ran concurrently and each hit its own timeout
    assert!(begin.elapsed() < Duration::from_secs(2), "fan-out was serialized");
    assert_eq!(executor.max_active(), 3);
    assert_eq!(result.len(), 3);
    assert!(result.outcomes().all(|o| o.is_failed()));
    assert!(result
        .get("alpha")
        .unwrap()
        .error()
        .unwrap()
        .contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_target_does_not_delay_fast_sibling() {
    let (registry, executor) = setup(vec![
        ("fast", Script::ok(1)),
        ("slow", Script::Hang),
    ]);
    let dispatcher = Dispatcher::new(
        registry,
        executor,
        dispatch_config(Duration::from_secs(2)),
    );

    let begin = tokio::time::Instant::now();
    let request = QueryRequest::new("SELECT 1", ["fast", "slow"]);
    let result = dispatcher
        .dispatch(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.get("fast").unwrap().is_success());
    assert!(result.get("fast").unwrap().duration < Duration::from_millis(100));
    assert!(result.get("slow").unwrap().is_failed());
    // Total wall time is the slow target's timeout, not a sum
    assert!(begin.elapsed() < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_presentation_order_is_lexicographic_not_completion_order() {
    // The alphabetically-first target is the slowest to complete
    let (registry, executor) = setup(vec![
        ("alpha", Script::ok_after(1, Duration::from_millis(500))),
        ("beta", Script::ok_after(1, Duration::from_millis(20))),
        ("gamma", Script::ok_after(1, Duration::from_millis(1))),
    ]);
    let dispatcher = Dispatcher::new(
        registry,
        executor,
        dispatch_config(Duration::from_secs(30)),
    );

    let request = QueryRequest::new("SELECT 1", ["gamma", "alpha", "beta"]);
    let result = dispatcher
        .dispatch(&request, &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<&str> = result.outcomes().map(|o| o.target.as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
    assert!(result.outcomes().all(|o| o.is_success()));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_keeps_finished_outcomes_and_records_the_rest() {
    let (registry, executor) = setup(vec![
        ("fast", Script::ok(3)),
        ("slow", Script::Hang),
    ]);
    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        executor,
        dispatch_config(Duration::from_secs(3600)),
    ));

    let cancel = CancellationToken::new();
    let handle = {
        let dispatcher = Arc::clone(&dispatcher);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let request = QueryRequest::new("SELECT 1", ["fast", "slow"]);
            dispatcher.dispatch(&request, &cancel).await.unwrap()
        })
    };

    // Let "fast" finish, then cancel while "slow" is in flight
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    let result = handle.await.unwrap();

    // Already-completed outcome preserved verbatim
    let fast = result.get("fast").unwrap();
    assert!(fast.is_success());
    assert_eq!(fast.table().unwrap().row_count(), 3);

    // In-flight target recorded as cancelled, never missing
    assert!(result.get("slow").unwrap().is_cancelled());
    assert_eq!(result.len(), 2);
    assert_eq!(result.summary().cancelled, 1);
}

#[tokio::test(start_paused = true)]
async fn test_target_removed_mid_flight_still_yields_its_outcome() {
    let (registry, executor) = setup(vec![
        ("alpha", Script::ok_after(2, Duration::from_millis(200))),
        ("beta", Script::ok(1)),
    ]);
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&registry),
        executor,
        dispatch_config(Duration::from_secs(30)),
    ));

    let handle = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let request = QueryRequest::new("SELECT 1", ["alpha", "beta"]);
            dispatcher.dispatch(&request, &CancellationToken::new()).await.unwrap()
        })
    };

    // Resolution took its snapshot up front: removing the target while
    // its query is still running affects neither the execution nor the
    // aggregate.
    tokio::time::sleep(Duration::from_millis(50)).await;
    registry.remove("alpha").unwrap();
    let result = handle.await.unwrap();

    assert!(registry.get("alpha").is_none());
    assert_eq!(result.len(), 2);
    assert!(result.get("alpha").unwrap().is_success());
    assert_eq!(result.get("alpha").unwrap().table().unwrap().row_count(), 2);
}

#[tokio::test]
async fn test_partial_success_is_reported_as_data_not_error() {
    // One reachable target, one unreachable
    let (registry, executor) = setup(vec![
        ("A", Script::ok(1)),
        ("B", Script::Fail("no route to host")),
    ]);
    let dispatcher = Dispatcher::new(
        registry,
        executor,
        dispatch_config(Duration::from_secs(30)),
    );

    let request = QueryRequest::new("SELECT 1", ["A", "B"]);
    let result = dispatcher
        .dispatch(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.get("A").unwrap().is_success());
    assert_eq!(result.get("A").unwrap().table().unwrap().row_count(), 1);
    assert!(result.get("B").unwrap().error().unwrap().contains("no route"));
    let summary = result.summary();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
}

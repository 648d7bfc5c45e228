//! Stop transition: ordering, concurrency, serialization and rollback.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Barrier;

use content_node::error::{NodeError, Subsystem};
use content_node::subsystems::{BlockService, Repository};
use content_node::NodeState;

mod common;

use common::{until, within, Gate, Harness};

#[tokio::test]
async fn test_stop_detaches_then_stops_concurrently() {
    let harness = Harness::new();
    let node = harness.started_node().await;
    let online = node.api().await.unwrap();

    // Completes only if all three stops are in flight together.
    let barrier = Arc::new(Barrier::new(3));
    harness.repo.hooks.join_stop(&barrier);
    harness.transport.hooks.join_stop(&barrier);
    harness.publisher.hooks.join_stop(&barrier);

    let offline = within(online.stop()).await.unwrap();
    assert_eq!(offline.state(), NodeState::Stopped);
    assert_eq!(node.state(), NodeState::Stopped);

    let log = &harness.log;
    assert!(log.position("block_service.unset_exchange") < log.position("exchange.stop"));
    assert!(log.position("exchange.stop") < log.position("prefetcher.stop"));
    assert!(log.position("prefetcher.stop") < log.position("repo.stop.issued"));

    let last_issue = ["repo", "transport", "publisher"]
        .iter()
        .map(|name| log.position(&format!("{name}.stop.issued")))
        .max()
        .unwrap();
    let first_done = ["repo", "transport", "publisher"]
        .iter()
        .map(|name| log.position(&format!("{name}.stop.done")))
        .min()
        .unwrap();
    assert!(last_issue < first_done, "stops awaited before all issued: {:?}", log.events());

    assert!(!harness.block_service.has_exchange());
    assert!(!harness.repo.is_open());
}

#[tokio::test]
async fn test_stopped_surface_stop_returns_itself() {
    let harness = Harness::new();
    let node = harness.started_node().await;

    let offline = node.stop().await.unwrap();
    let again = offline.stop().await.unwrap();
    let third = again.stop().await.unwrap();

    assert!(Arc::ptr_eq(&offline, &again));
    assert!(Arc::ptr_eq(&offline, &third));
    assert!(Arc::ptr_eq(&offline, &node.api().await.unwrap()));
    assert_eq!(harness.repo.hooks.stops(), 1);
}

#[tokio::test]
async fn test_concurrent_stops_share_one_teardown() {
    let harness = Harness::new();
    let node = harness.started_node().await;
    let online = node.api().await.unwrap();

    let gate = Gate::new();
    harness.repo.hooks.gate_stop(&gate);

    let first = tokio::spawn({
        let online = online.clone();
        async move { online.stop().await }
    });
    until(|| node.state() == NodeState::Stopping).await;

    let second = tokio::spawn({
        let online = online.clone();
        async move { online.stop().await }
    });
    tokio::task::yield_now().await;
    gate.open();

    let first = within(first).await.unwrap().unwrap();
    let second = within(second).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert_eq!(harness.repo.hooks.stops(), 1);
    assert_eq!(harness.transport.hooks.stops(), 1);
    assert_eq!(harness.publisher.hooks.stops(), 1);
}

#[tokio::test]
async fn test_concurrent_stops_share_failure() {
    let harness = Harness::new();
    let node = harness.started_node().await;
    let online = node.api().await.unwrap();

    let gate = Gate::new();
    harness.repo.hooks.gate_stop(&gate);
    harness.repo.hooks.fail_stop("disk busy");

    let first = tokio::spawn({
        let online = online.clone();
        async move { online.stop().await }
    });
    until(|| node.state() == NodeState::Stopping).await;
    let second = tokio::spawn({
        let online = online.clone();
        async move { online.stop().await }
    });
    tokio::task::yield_now().await;
    gate.open();

    let first = within(first).await.unwrap().unwrap_err();
    let second = within(second).await.unwrap().unwrap_err();
    assert_eq!(first, second);
    assert_eq!(harness.repo.hooks.stops(), 1);
}

#[tokio::test]
async fn test_repo_close_failure_rolls_back() {
    let harness = Harness::new();
    let node = harness.started_node().await;
    let before = node.api().await.unwrap();

    harness.repo.hooks.fail_stop("disk busy");

    let err = node.stop().await.unwrap_err();
    let NodeError::SubsystemStop(failures) = err else {
        panic!("expected a stop failure, got {err:?}");
    };
    assert!(failures.failed(Subsystem::Repository));
    assert!(!failures.failed(Subsystem::Transport));
    assert!(failures.stopped.contains(&Subsystem::Transport));
    assert!(failures.stopped.contains(&Subsystem::NamePublisher));

    let after = node.api().await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(node.state(), NodeState::Started);
    assert!(after.swarm().is_ok());
}

#[tokio::test]
async fn test_every_join_failure_is_reported() {
    let harness = Harness::new();
    let node = harness.started_node().await;

    harness.repo.hooks.fail_stop("disk busy");
    harness.transport.hooks.fail_stop("socket stuck");

    let Err(NodeError::SubsystemStop(failures)) = node.stop().await else {
        panic!("expected a stop failure");
    };
    assert!(failures.failed(Subsystem::Repository));
    assert!(failures.failed(Subsystem::Transport));
    assert_eq!(failures.stopped, vec![Subsystem::NamePublisher]);
}

#[tokio::test]
async fn test_lookups_during_stop_see_one_surface() {
    let harness = Harness::new();
    let node = harness.started_node().await;
    let online = node.api().await.unwrap();

    let gate = Gate::new();
    harness.repo.hooks.gate_stop(&gate);

    let stop = tokio::spawn({
        let online = online.clone();
        async move { online.stop().await }
    });
    until(|| node.state() == NodeState::Stopping).await;

    // Issued while pending: resolves with the post-stop surface.
    let lookup = tokio::spawn({
        let node = node.clone();
        async move { node.api().await }
    });
    // The committed surface is still the online one until commit.
    assert!(Arc::ptr_eq(&node.manager().committed(), &online));

    gate.open();
    let stopped = within(stop).await.unwrap().unwrap();
    let seen = within(lookup).await.unwrap().unwrap();

    assert!(Arc::ptr_eq(&stopped, &seen));
    assert_eq!(seen.state(), NodeState::Stopped);
    assert_eq!(seen.swarm().err(), Some(NodeError::NotStarted));
}

#[tokio::test]
async fn test_dropped_stop_rolls_back() {
    let harness = Harness::new();
    let node = harness.started_node().await;
    let online = node.api().await.unwrap();

    let gate = Gate::new();
    harness.repo.hooks.gate_stop(&gate);

    let reader = {
        let node = node.clone();
        async move {
            until(|| node.state() == NodeState::Stopping).await;
            node.api().await
        }
    };
    let (timed_out, seen) = tokio::join!(tokio::time::timeout(Duration::from_millis(50), online.stop()), reader);

    assert!(timed_out.is_err());
    assert_eq!(seen.unwrap_err(), NodeError::TransitionAbandoned);
    assert_eq!(node.state(), NodeState::Started);
    assert!(Arc::ptr_eq(&node.manager().committed(), &online));
}

#[tokio::test]
async fn test_stop_waiting_on_failed_start_returns_stopped_surface() {
    let harness = Harness::new();
    let node = harness.started_node().await;
    let online = node.api().await.unwrap();
    let offline = node.stop().await.unwrap();

    let gate = Gate::new();
    harness.publisher.hooks.gate_start(&gate);
    harness.publisher.hooks.fail_start("no keys");

    let start = tokio::spawn({
        let offline = offline.clone();
        async move { offline.start().await }
    });
    until(|| node.state() == NodeState::Starting).await;

    // A stale online surface: its stop has to wait for the start to settle.
    let stop = tokio::spawn({
        let online = online.clone();
        async move { online.stop().await }
    });
    for _ in 0..3 {
        tokio::task::yield_now().await;
    }
    assert!(!stop.is_finished());
    gate.open();

    let err = within(start).await.unwrap().unwrap_err();
    assert!(matches!(err, NodeError::SubsystemStart(ref e) if e.message == "no keys"));

    let surface = within(stop).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&surface, &offline));
    assert_eq!(node.state(), NodeState::Stopped);
    // Only the first stop reached the publisher; the waiting one tore nothing down.
    assert_eq!(harness.publisher.hooks.stops(), 1);
}

//! Contract Test: Event Loop
//!
//! Verifies how the engine drains the runtime event feed.
//!
//! Constraints verified:
//! - Events are reconciled one at a time, in delivery order
//! - A failed event never stops the loop
//! - Unrecognised statuses are skipped without inspecting the container
//! - Losing the event feed is fatal

mod common;

use common::*;
use registrator_core::engine::EngineEvent;
use registrator_core::error::Error;
use registrator_core::traits::{ChangeAction, EventStatus, LifecycleEvent};
use registrator_core::{Outcome, Reconciliation, RegistratorEngine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Collect the outcomes of the next `n` reconciliations
async fn next_reconciliations(
    rx: &mut mpsc::Receiver<EngineEvent>,
    n: usize,
) -> Vec<Reconciliation> {
    let mut seen = Vec::new();
    while seen.len() < n {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("engine event in time")
            .expect("channel open");
        if let EngineEvent::Reconciled(r) = event {
            seen.push(r);
        }
    }
    seen
}

#[tokio::test]
async fn events_are_reconciled_in_delivery_order() {
    let (runtime, feed) = ScriptedRuntime::new();
    let runtime = Arc::new(runtime.with_container(service_container("web", "web-service")));
    let resolver = Arc::new(CountingResolver::new("10.0.0.5"));
    let store = Arc::new(CountingStore::new());

    let (engine, mut event_rx) =
        RegistratorEngine::new(runtime.clone(), resolver, store.clone(), minimal_config())
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    for action in ["start", "start", "die", "stop"] {
        feed.send(Ok(LifecycleEvent::new("web", EventStatus::from_action(action))))
            .unwrap();
    }

    let outcomes: Vec<Outcome> = next_reconciliations(&mut event_rx, 4)
        .await
        .into_iter()
        .map(|r| r.outcome)
        .collect();

    assert_eq!(
        outcomes,
        vec![
            Outcome::Created,
            Outcome::AlreadyExists,
            Outcome::Deleted,
            Outcome::NotFound,
        ]
    );
    assert_eq!(store.apply_count(ChangeAction::Create), 1);
    assert_eq!(store.apply_count(ChangeAction::Delete), 1);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn failed_inspection_does_not_stop_the_loop() {
    let (runtime, feed) = ScriptedRuntime::new();
    let runtime = Arc::new(runtime.with_container(service_container("web", "web-service")));
    let store = Arc::new(CountingStore::new());

    let (engine, mut event_rx) = RegistratorEngine::new(
        runtime.clone(),
        Arc::new(CountingResolver::new("10.0.0.5")),
        store.clone(),
        minimal_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    feed.send(Ok(LifecycleEvent::new("gone", EventStatus::Start)))
        .unwrap();
    feed.send(Ok(LifecycleEvent::new("web", EventStatus::Start)))
        .unwrap();

    let seen = next_reconciliations(&mut event_rx, 2).await;
    assert!(seen[0].outcome.is_failure());
    assert_eq!(seen[0].container_id, "gone");
    assert_eq!(seen[1].outcome, Outcome::Created);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn unrecognised_statuses_skip_inspection() {
    let (runtime, feed) = ScriptedRuntime::new();
    let runtime = Arc::new(runtime.with_container(service_container("web", "web-service")));
    let resolver = Arc::new(CountingResolver::new("10.0.0.5"));
    let store = Arc::new(CountingStore::new());

    let (engine, mut event_rx) = RegistratorEngine::new(
        runtime.clone(),
        resolver.clone(),
        store.clone(),
        minimal_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    for action in ["create", "attach", "exec_start: sh", "destroy"] {
        feed.send(Ok(LifecycleEvent::new("web", EventStatus::from_action(action))))
            .unwrap();
    }

    let seen = next_reconciliations(&mut event_rx, 4).await;
    assert!(seen.iter().all(|r| r.outcome == Outcome::Skipped));
    assert_eq!(runtime.inspect_call_count(), 0);
    assert_eq!(resolver.call_count(), 0);
    assert_eq!(store.query_count(), 0);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn feed_errors_are_reported_and_skipped() {
    let (runtime, feed) = ScriptedRuntime::new();
    let runtime = Arc::new(runtime.with_container(service_container("web", "web-service")));

    let (engine, mut event_rx) = RegistratorEngine::new(
        runtime,
        Arc::new(CountingResolver::new("10.0.0.5")),
        Arc::new(CountingStore::new()),
        minimal_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    feed.send(Err(Error::runtime("connection reset"))).unwrap();
    feed.send(Ok(LifecycleEvent::new("web", EventStatus::Start)))
        .unwrap();

    let mut stream_errors = 0;
    let mut reconciled = Vec::new();
    while reconciled.is_empty() {
        match tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
            .await
            .unwrap()
            .unwrap()
        {
            EngineEvent::StreamError { error } => {
                assert!(error.contains("connection reset"));
                stream_errors += 1;
            }
            EngineEvent::Reconciled(r) => reconciled.push(r.outcome),
            _ => {}
        }
    }

    assert_eq!(stream_errors, 1);
    assert_eq!(reconciled, vec![Outcome::Created]);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn lost_event_feed_is_fatal() {
    let (runtime, feed) = ScriptedRuntime::new();

    let (engine, _event_rx) = RegistratorEngine::new(
        Arc::new(runtime),
        Arc::new(CountingResolver::new("10.0.0.5")),
        Arc::new(CountingStore::new()),
        minimal_config(),
    )
    .unwrap();

    drop(feed);

    let result = tokio::time::timeout(Duration::from_secs(2), engine.run())
        .await
        .expect("engine returns once the feed ends");
    assert!(matches!(result, Err(Error::Runtime(_))));
}

#[tokio::test]
async fn started_event_names_zone_and_classifier() {
    let (runtime, _feed) = ScriptedRuntime::new();

    let (engine, mut event_rx) = RegistratorEngine::new(
        Arc::new(runtime),
        Arc::new(CountingResolver::new("10.0.0.5")),
        Arc::new(CountingStore::new()),
        minimal_config(),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    let first = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        first,
        EngineEvent::Started {
            zone_id: ZONE.to_string(),
            classifier: "label",
        }
    );

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let (runtime, _feed) = ScriptedRuntime::new();
    let mut config = minimal_config();
    config.zone_id = String::new();

    let result = RegistratorEngine::new(
        Arc::new(runtime),
        Arc::new(CountingResolver::new("10.0.0.5")),
        Arc::new(CountingStore::new()),
        config,
    );

    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn startup_purge_runs_before_subscribing() {
    use registrator_core::config::ClassifierConfig;
    use registrator_core::traits::{RecordStore, RegistrationTarget};

    let (runtime, _feed) = ScriptedRuntime::new();
    let store = Arc::new(CountingStore::new());
    store
        .inner()
        .apply(
            ZONE,
            ChangeAction::Create,
            &RegistrationTarget::new("registry.example.com", "10.0.0.5"),
        )
        .await
        .unwrap();

    let mut config = minimal_config();
    config.classifier = ClassifierConfig::ContainerName {
        container: "docker-registry".to_string(),
        record_name: "registry.example.com".to_string(),
    };
    config.engine.purge_on_start = true;

    let (engine, mut event_rx) = RegistratorEngine::new(
        Arc::new(runtime),
        Arc::new(CountingResolver::new("10.0.0.5")),
        store.clone(),
        config,
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    let first = tokio::time::timeout(Duration::from_secs(2), event_rx.recv())
        .await
        .unwrap()
        .unwrap();
    match first {
        EngineEvent::Purged(r) => assert_eq!(r.outcome, Outcome::Deleted),
        other => panic!("expected purge first, got {:?}", other),
    }
    assert!(store.inner().is_empty(ZONE).await);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

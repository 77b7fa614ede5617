mod common;

use common::{harness, serving_harness, settings};
use holdline_call::{CallError, LifecycleState, NavState};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn start_serving_is_idempotent() {
    let h = harness(settings());

    let first = h.manager.start_serving().await.unwrap();
    let second = h.manager.start_serving().await.unwrap();
    assert_eq!(first, "https://hooks.test");
    assert_eq!(first, second);

    // The listener is handed over exactly once.
    assert!(h.manager.take_listener().is_some());
    assert!(h.manager.take_listener().is_none());
}

#[tokio::test]
async fn place_call_requires_serving() {
    let h = harness(settings());
    let err = h.manager.place_call().await.unwrap_err();
    assert!(matches!(err, CallError::NotServing));
    assert_eq!(h.provider.placed_count(), 0);
}

#[tokio::test]
async fn place_call_records_identity_and_callback() {
    let (h, sid) = serving_harness(settings()).await;

    let placed = h.provider.last_placed().unwrap();
    assert_eq!(placed.sid, sid);
    assert_eq!(placed.to, "+15552223333");
    assert_eq!(placed.voice_url, "https://hooks.test/voice");

    let status = h.manager.status();
    assert_eq!(status.state, LifecycleState::Calling);
    assert!(status.is_calling);
    assert!(!status.is_done);
    assert_eq!(status.call_sid.as_deref(), Some(sid.as_str()));
    assert!(status.started_at.is_some());
    assert!(status.ended_at.is_none());
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn placement_failure_is_recorded_and_retryable() {
    let h = harness(settings());
    h.manager.start_serving().await.unwrap();

    h.provider.fail_placement.store(true, Ordering::SeqCst);
    let err = h.manager.place_call().await.unwrap_err();
    assert!(matches!(err, CallError::CallPlacement(_)));

    let status = h.manager.status();
    assert_eq!(status.state, LifecycleState::Idle);
    assert!(status.last_error.is_some());

    // The manager stays usable for a retry.
    h.provider.fail_placement.store(false, Ordering::SeqCst);
    h.manager.place_call().await.unwrap();
    let status = h.manager.status();
    assert!(status.is_calling);
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn redial_discards_previous_identifier() {
    let (h, first_sid) = serving_harness(settings()).await;
    let second_sid = h.manager.place_call().await.unwrap();
    assert_ne!(first_sid, second_sid);
    assert_eq!(
        h.manager.status().call_sid.as_deref(),
        Some(second_sid.as_str())
    );
}

#[tokio::test]
async fn stop_terminates_and_resets() {
    let (h, sid) = serving_harness(settings()).await;

    h.manager.stop().await;
    assert_eq!(h.provider.completed_sids(), vec![sid]);

    let status = h.manager.status();
    assert_eq!(status.state, LifecycleState::Idle);
    assert_eq!(status.navigation, NavState::AwaitingVerificationCode);
    assert!(status.call_sid.is_none());
    assert!(status.ended_at.is_some());

    // Idempotent: no second termination request, no panic.
    h.manager.stop().await;
    assert_eq!(h.provider.completed_sids().len(), 1);
}

#[tokio::test]
async fn mark_failed_surfaces_in_status() {
    let (h, _sid) = serving_harness(settings()).await;

    h.manager.mark_failed("provider meltdown");
    let status = h.manager.status();
    assert_eq!(status.state, LifecycleState::Failed);
    assert!(status.is_failed);
    assert!(!status.is_calling);
    assert_eq!(status.last_error.as_deref(), Some("provider meltdown"));
    assert!(status.duration_seconds.is_some());
}

#[tokio::test]
async fn wait_until_done_resolves_on_completion() {
    let (h, _sid) = serving_harness(settings()).await;

    let manager = h.manager.clone();
    let waiter = tokio::spawn(async move { manager.wait_until_done().await });

    h.manager.mark_failed("gave up");
    tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
        .await
        .expect("wait_until_done should resolve once a terminal outcome is recorded")
        .unwrap();
}

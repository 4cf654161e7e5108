// Engine lifecycle and action tests against a scripted host

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use vitality::actions::ActionGateway;
use vitality::apps::NoRegistry;
use vitality::engine::MonitorEngine;
use vitality::error::ActionError;

fn engine(runner: RecordingRunner) -> MonitorEngine<FakeSource, RecordingRunner> {
    MonitorEngine::with_parts(
        FakeSource::healthy(),
        Arc::new(NoRegistry),
        ActionGateway::new(runner),
        sampling(60, 5),
    )
}

#[tokio::test]
async fn test_start_publishes_immediately_and_stop_halts_ticks() {
    let engine = engine(RecordingRunner::default());
    let mut rx = engine.subscribe();
    assert_eq!(engine.current().sequence, 0);

    assert!(engine.start());
    assert!(!engine.start(), "second start is a no-op");
    assert!(engine.is_running());

    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .expect("first tick within the interval")
        .unwrap();
    assert!(rx.borrow_and_update().sequence >= 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(engine.stop().await);
    assert!(!engine.is_running());
    let stopped_at = engine.current().sequence;
    assert!(stopped_at >= 2);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(engine.current().sequence, stopped_at);
    assert!(!engine.stop().await);
}

#[tokio::test]
async fn test_restart_keeps_sequence_and_history() {
    let engine = engine(RecordingRunner::default());
    engine.start();
    tokio::time::sleep(Duration::from_millis(60)).await;
    engine.stop().await;
    let before = engine.current();

    engine.start();
    tokio::time::sleep(Duration::from_millis(60)).await;
    engine.stop().await;
    let after = engine.current();

    assert!(after.sequence > before.sequence);
    assert!(after.cpu_history.len() > before.cpu_history.len());
}

#[tokio::test]
async fn test_refresh_runs_one_tick() {
    let engine = engine(RecordingRunner::default());
    let first = engine.refresh().await;
    let second = engine.refresh().await;
    assert_eq!(first.sequence, 1);
    assert_eq!(second.sequence, 2);
    assert_eq!(engine.current().sequence, 2);
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_independent_engines_do_not_share_state() {
    let a = engine(RecordingRunner::default());
    let b = engine(RecordingRunner::default());
    a.refresh().await;
    a.refresh().await;
    b.refresh().await;
    assert_eq!(a.current().sequence, 2);
    assert_eq!(b.current().sequence, 1);
}

#[tokio::test]
async fn test_eject_reports_failure_without_panicking() {
    let engine = engine(RecordingRunner::failing());
    let err = engine.eject("disk4").await.unwrap_err();
    assert!(matches!(err, ActionError::Command(_)));

    let err = engine.eject("/").await.unwrap_err();
    assert!(matches!(err, ActionError::InvalidTarget(_)));
}

#[tokio::test]
async fn test_kill_refuses_protected_pids() {
    let engine = engine(RecordingRunner::default());
    assert!(matches!(
        engine.kill_process(1),
        Err(ActionError::InvalidTarget(_))
    ));
    assert!(matches!(
        engine.kill_process(std::process::id()),
        Err(ActionError::InvalidTarget(_))
    ));
}

#[tokio::test]
async fn test_gateway_passes_target_to_runner() {
    let gateway = ActionGateway::new(RecordingRunner::default());
    gateway.eject("disk4").await.unwrap();
    gateway.eject("/Volumes/USB").await.unwrap();
    let calls = gateway.runner().calls();
    assert_eq!(calls.len(), 2);
    if cfg!(target_os = "macos") {
        assert_eq!(calls[0].1, ["eject", "disk4"]);
        assert_eq!(calls[1].1, ["eject", "/Volumes/USB"]);
    } else {
        assert_eq!(calls[0].1, ["/dev/disk4"]);
        assert_eq!(calls[1].1, ["/Volumes/USB"]);
    }
}

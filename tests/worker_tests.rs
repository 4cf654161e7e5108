// Sampler tick and worker loop tests against a scripted host

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use vitality::apps::NoRegistry;
use vitality::models::{ProcessRow, ThermalState};
use vitality::probe::UPTIME_UNAVAILABLE;
use vitality::store::SnapshotStore;
use vitality::worker::{Sampler, WorkerConfig, WorkerDeps, spawn, tick_and_publish};

fn sampler(source: FakeSource, history: usize, top_n: usize) -> Sampler<FakeSource> {
    Sampler::new(Arc::new(source), Arc::new(NoRegistry), &sampling(history, top_n))
}

#[tokio::test]
async fn test_tick_merges_every_probe() {
    let mut s = sampler(FakeSource::healthy(), 60, 5);
    let snap = s.tick().await;

    assert_eq!(snap.sequence, 1);
    assert!(snap.timestamp > 0);
    // First sample: no previous counters, so rates are zero.
    assert_eq!(snap.cpu_usage, 0.0);
    assert_eq!(snap.network_rx_bytes_per_sec, 0.0);
    assert_eq!(snap.memory_usage, 0.42);
    assert_eq!(snap.battery_health, 0.9);
    assert_eq!(snap.battery_cycles, 321);
    assert_eq!(snap.uptime_text, "2d 3h 4m");
    assert_eq!(snap.thermal_state, ThermalState::Fair);
    assert_eq!(snap.disks.len(), 1);
    assert_eq!(snap.top_cpu_apps[0].name, "Safari");
    assert_eq!(snap.top_cpu_apps[0].pid, Some(10));
    assert_eq!(snap.top_memory_apps[0].name, "Safari");
    assert_eq!(snap.cpu_history, vec![0.0]);
    assert_eq!(s.probe_failures(), 0);
}

#[tokio::test]
async fn test_failing_probes_yield_neutral_values() {
    let mut s = sampler(FakeSource::failing(), 60, 5);
    let snap = s.tick().await;

    assert_eq!(snap.sequence, 1);
    assert_eq!(snap.cpu_usage, 0.0);
    assert_eq!(snap.memory_usage, 0.0);
    assert_eq!(snap.battery_health, 0.0);
    assert_eq!(snap.battery_cycles, 0);
    assert_eq!(snap.uptime_secs, 0);
    assert_eq!(snap.uptime_text, UPTIME_UNAVAILABLE);
    assert_eq!(snap.thermal_state, ThermalState::Nominal);
    assert!(snap.disks.is_empty());
    assert!(snap.top_cpu_apps.is_empty());
    assert!(snap.top_memory_apps.is_empty());
    assert_eq!(s.probe_failures(), 9);
}

#[tokio::test]
async fn test_one_failing_probe_does_not_affect_the_others() {
    let source = FakeSource {
        battery: None,
        ..FakeSource::healthy()
    };
    let mut s = sampler(source, 60, 5);
    let snap = s.tick().await;
    assert_eq!(snap.battery_health, 0.0);
    assert_eq!(snap.memory_usage, 0.42);
    assert_eq!(snap.disks.len(), 1);
    assert_eq!(s.probe_failures(), 1);
}

#[tokio::test]
async fn test_cpu_utilization_uses_previous_tick() {
    let source = FakeSource::healthy().with_cpu_script([
        Some(ticks(100, 100, 800)),
        Some(ticks(175, 125, 900)), // +75 user, +25 system, +100 idle
        None,
        Some(ticks(275, 125, 900)), // fully busy since the last good sample
    ]);
    let mut s = sampler(source, 60, 5);
    assert_eq!(s.tick().await.cpu_usage, 0.0);
    assert!((s.tick().await.cpu_usage - 0.5).abs() < 1e-9);
    assert_eq!(s.tick().await.cpu_usage, 0.0);
    assert!((s.tick().await.cpu_usage - 1.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_network_rate_divides_by_elapsed_time() {
    let source = FakeSource::healthy().with_network_script([
        Some(counters(1_000, 2_000)),
        Some(counters(3_000, 2_500)),
        Some(counters(10, 10)), // counter reset
    ]);
    let mut s = sampler(source, 60, 5);
    let first = s.tick().await;
    assert_eq!(first.network_rx_bytes_per_sec, 0.0);

    tokio::time::advance(Duration::from_secs(2)).await;
    let second = s.tick().await;
    assert_eq!(second.network_rx_bytes_per_sec, 1000.0);
    assert_eq!(second.network_tx_bytes_per_sec, 250.0);

    tokio::time::advance(Duration::from_secs(2)).await;
    let third = s.tick().await;
    assert_eq!(third.network_rx_bytes_per_sec, 0.0);
    assert_eq!(third.network_tx_bytes_per_sec, 0.0);
}

#[tokio::test]
async fn test_history_keeps_most_recent_samples() {
    // Tick k (k >= 2) has utilization k / 100.
    let mut script = Vec::new();
    let (mut user, mut idle) = (0u64, 0u64);
    for k in 1..=70u64 {
        if k > 1 {
            user += k;
            idle += 100 - k;
        }
        script.push(Some(ticks(user, 0, idle)));
    }
    let source = FakeSource::healthy().with_cpu_script(script);
    let mut s = sampler(source, 60, 5);

    let mut last = None;
    for _ in 0..70 {
        last = Some(s.tick().await);
    }
    let history = last.unwrap().cpu_history;
    assert_eq!(history.len(), 60);
    assert!((history[0] - 0.11).abs() < 1e-9, "oldest is tick 11, got {}", history[0]);
    assert!((history[59] - 0.70).abs() < 1e-9);
}

#[tokio::test]
async fn test_top_lists_respect_top_n() {
    let source = FakeSource {
        cpu_rows: Some(
            (1..=10)
                .map(|i| ProcessRow::cpu(i, format!("/usr/bin/app{i}"), i as f64))
                .collect(),
        ),
        ..FakeSource::healthy()
    };
    let mut s = sampler(source, 60, 3);
    let snap = s.tick().await;
    let names: Vec<&str> = snap.top_cpu_apps.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["app10", "app9", "app8"]);
}

#[tokio::test]
async fn test_tick_and_publish_updates_subscribers() {
    let sampler = tokio::sync::Mutex::new(sampler(FakeSource::healthy(), 60, 5));
    let store = SnapshotStore::new();
    let mut rx = store.subscribe();

    let published = tick_and_publish(&sampler, &store).await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().sequence, published.sequence);
    assert_eq!(store.current().sequence, 1);
}

#[tokio::test]
async fn test_worker_spawn_ticks_and_shuts_down() {
    let source = Arc::new(FakeSource::healthy());
    let sampler = Arc::new(tokio::sync::Mutex::new(Sampler::new(
        source.clone(),
        Arc::new(NoRegistry),
        &sampling(60, 5),
    )));
    let store = SnapshotStore::new();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let handle = spawn(
        WorkerDeps {
            sampler: sampler.clone(),
            store: store.clone(),
            shutdown_rx,
        },
        WorkerConfig {
            interval_ms: 25,
            stats_log_interval_secs: 3600,
        },
    );
    tokio::time::sleep(Duration::from_millis(150)).await;
    let _ = shutdown_tx.send(());
    handle.await.unwrap();

    let published = store.current().sequence;
    assert!(published >= 2, "expected several ticks, got {published}");
    assert_eq!(published as usize, source.cpu_calls());
    assert_eq!(sampler.lock().await.ticks(), published);
}

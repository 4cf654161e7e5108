// Sampling worker: one tick fans out to every probe, merges the results into a snapshot,
// and the periodic loop publishes each snapshot to the store.

use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};
use tokio::time::{Duration, interval};
use tracing::Instrument;

use crate::apps::{AppRegistry, top_cpu_apps, top_memory_apps};
use crate::config::SamplingConfig;
use crate::error::ProbeError;
use crate::models::{Snapshot, ThermalState};
use crate::probe::{HostSource, UPTIME_UNAVAILABLE, format_uptime};
use crate::rate::{NetworkSample, RateCache};
use crate::store::{CpuHistory, SnapshotStore};

/// Owns everything that must survive between ticks: the previous raw counters, the
/// CPU history ring and the sequence number.
pub struct Sampler<S: HostSource> {
    source: Arc<S>,
    registry: Arc<dyn AppRegistry>,
    cache: RateCache,
    history: CpuHistory,
    sequence: u64,
    top_n: usize,
    probe_failures: u64,
}

impl<S: HostSource> Sampler<S> {
    pub fn new(source: Arc<S>, registry: Arc<dyn AppRegistry>, config: &SamplingConfig) -> Self {
        Self {
            source,
            registry,
            cache: RateCache::new(),
            history: CpuHistory::new(config.history_capacity),
            sequence: 0,
            top_n: config.top_n,
            probe_failures: 0,
        }
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.sequence
    }

    /// Probe failures across all ticks.
    pub fn probe_failures(&self) -> u64 {
        self.probe_failures
    }

    fn settle<T>(&mut self, result: Result<T, ProbeError>, operation: &'static str) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.probe_failures += 1;
                tracing::warn!(error = %e, operation, "probe failed; using neutral value");
                None
            }
        }
    }

    /// Run every probe concurrently and build the next snapshot. Never fails: a probe
    /// error leaves its field at the neutral value.
    pub async fn tick(&mut self) -> Snapshot {
        let source = self.source.clone();
        let (cpu, memory, battery, uptime, thermal, network, disks, cpu_rows, memory_rows) = tokio::join!(
            source.cpu_ticks(),
            source.memory_usage(),
            source.battery(),
            source.uptime(),
            source.thermal_state(),
            async { source.network_counters().await.map(NetworkSample::now) },
            source.disks(),
            source.cpu_processes(),
            source.memory_processes(),
        );

        let cpu = self.settle(cpu, "cpu_ticks");
        let memory = self.settle(memory, "memory_usage");
        let battery = self.settle(battery, "battery");
        let uptime = self.settle(uptime, "uptime");
        let thermal = self.settle(thermal, "thermal_state");
        let network = self.settle(network, "network_counters");
        let disks = self.settle(disks, "disks");
        let cpu_rows = self.settle(cpu_rows, "cpu_processes");
        let memory_rows = self.settle(memory_rows, "memory_processes");

        // Deltas come from the previous cached sample; the cache is updated in the same call.
        let cpu_usage = self.cache.advance_cpu(cpu);
        let (rx, tx) = self.cache.advance_network(network);
        self.history.push(cpu_usage);
        self.sequence += 1;

        let registry = self.registry.as_ref();
        let top_cpu = cpu_rows
            .map(|rows| top_cpu_apps(&rows, self.top_n, registry))
            .unwrap_or_default();
        let top_memory = memory_rows
            .map(|rows| top_memory_apps(&rows, self.top_n, registry))
            .unwrap_or_default();

        let (battery_health, battery_cycles) = battery
            .map(|b| (b.health.clamp(0.0, 1.0), b.cycle_count))
            .unwrap_or((0.0, 0));
        let uptime_secs = uptime.map(|d| d.as_secs());

        let snapshot = Snapshot {
            sequence: self.sequence,
            timestamp: now_millis(),
            cpu_usage,
            memory_usage: memory.map(clamp_fraction).unwrap_or(0.0),
            battery_health,
            battery_cycles,
            uptime_secs: uptime_secs.unwrap_or(0),
            uptime_text: uptime_secs
                .map(format_uptime)
                .unwrap_or_else(|| UPTIME_UNAVAILABLE.to_string()),
            thermal_state: thermal.unwrap_or(ThermalState::Nominal),
            disks: disks.unwrap_or_default(),
            top_cpu_apps: top_cpu,
            top_memory_apps: top_memory,
            network_rx_bytes_per_sec: rx,
            network_tx_bytes_per_sec: tx,
            cpu_history: self.history.to_vec(),
        };

        tracing::debug!(
            operation = "tick",
            sequence = snapshot.sequence,
            cpu_usage = snapshot.cpu_usage,
            memory_usage = snapshot.memory_usage,
            "tick complete"
        );
        snapshot
    }
}

fn clamp_fraction(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// Run one tick and publish it while still holding the sampler, so snapshots reach the
/// store in sequence order.
pub async fn tick_and_publish<S: HostSource>(
    sampler: &Mutex<Sampler<S>>,
    store: &SnapshotStore,
) -> Arc<Snapshot> {
    let mut sampler = sampler.lock().await;
    let snapshot = sampler.tick().await;
    store.publish(snapshot)
}

/// Sampler, store, and shutdown for the worker.
pub struct WorkerDeps<S: HostSource> {
    pub sampler: Arc<Mutex<Sampler<S>>>,
    pub store: SnapshotStore,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Worker timing config.
pub struct WorkerConfig {
    pub interval_ms: u64,
    /// How often to log worker stats (real seconds).
    pub stats_log_interval_secs: u64,
}

impl From<&SamplingConfig> for WorkerConfig {
    fn from(c: &SamplingConfig) -> Self {
        Self {
            interval_ms: c.interval_ms,
            stats_log_interval_secs: c.stats_log_interval_secs,
        }
    }
}

/// Spawns the periodic sampling task. The first tick runs immediately. Shutdown is only
/// observed between ticks, so an in-flight tick always completes and publishes.
pub fn spawn<S: HostSource>(deps: WorkerDeps<S>, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        sampler,
        store,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        interval_ms,
        stats_log_interval_secs,
    } = config;

    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", interval_ms);

    tokio::spawn(
        async move {
            let mut tick = interval(Duration::from_millis(interval_ms));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
            stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The stats interval also fires immediately; skip that one.
            stats_log_tick.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Worker shutting down");
                        break;
                    }
                    _ = tick.tick() => {
                        tick_and_publish(&sampler, &store).await;
                    }
                    _ = stats_log_tick.tick() => {
                        let (ticks, probe_failures) = {
                            let s = sampler.lock().await;
                            (s.ticks(), s.probe_failures())
                        };
                        tracing::info!(
                            ticks,
                            probe_failures,
                            subscribers = store.subscriber_count(),
                            "sampler stats"
                        );
                    }
                }
            }
        }
        .instrument(worker_span),
    )
}

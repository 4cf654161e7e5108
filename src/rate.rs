// Rate calculator: utilization and throughput from two counter samples.
// RateCache holds the previous raw sample between ticks.

use tokio::time::Instant;

use crate::models::{CpuTicks, NetworkCounters};

/// CPU utilization in [0, 1] over the interval between two tick samples.
///
/// Returns 0 for the first sample and whenever no ticks elapsed. Counters that went
/// backwards are treated as zero deltas.
pub fn cpu_utilization(prev: Option<&CpuTicks>, cur: &CpuTicks) -> f64 {
    let Some(prev) = prev else {
        return 0.0;
    };
    let d_total = cur.total().saturating_sub(prev.total());
    if d_total == 0 {
        return 0.0;
    }
    let d_idle = cur.idle.saturating_sub(prev.idle).min(d_total);
    (1.0 - d_idle as f64 / d_total as f64).clamp(0.0, 1.0)
}

/// Network counters plus the instant they were read.
#[derive(Debug, Clone, Copy)]
pub struct NetworkSample {
    pub counters: NetworkCounters,
    pub at: Instant,
}

impl NetworkSample {
    pub fn now(counters: NetworkCounters) -> Self {
        Self {
            counters,
            at: Instant::now(),
        }
    }
}

/// (rx, tx) bytes per second between two samples, divided by the time that actually
/// elapsed. A counter reset gives 0 for that direction.
pub fn throughput(prev: Option<&NetworkSample>, cur: &NetworkSample) -> (f64, f64) {
    let Some(prev) = prev else {
        return (0.0, 0.0);
    };
    let secs = cur.at.saturating_duration_since(prev.at).as_secs_f64();
    if secs <= 0.0 {
        return (0.0, 0.0);
    }
    let rate = |cur: u64, prev: u64| cur.saturating_sub(prev) as f64 / secs;
    (
        rate(cur.counters.received, prev.counters.received),
        rate(cur.counters.transmitted, prev.counters.transmitted),
    )
}

/// Previous raw samples, carried from one tick to the next.
#[derive(Debug, Default)]
pub struct RateCache {
    cpu: Option<CpuTicks>,
    network: Option<NetworkSample>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute utilization against the cached ticks, then cache `cur`.
    /// A failed read (`None`) yields 0 and leaves the cache untouched.
    pub fn advance_cpu(&mut self, cur: Option<CpuTicks>) -> f64 {
        let Some(cur) = cur else {
            return 0.0;
        };
        let usage = cpu_utilization(self.cpu.as_ref(), &cur);
        self.cpu = Some(cur);
        usage
    }

    /// Same contract as [`advance_cpu`](Self::advance_cpu), for network counters.
    pub fn advance_network(&mut self, cur: Option<NetworkSample>) -> (f64, f64) {
        let Some(cur) = cur else {
            return (0.0, 0.0);
        };
        let rates = throughput(self.network.as_ref(), &cur);
        self.network = Some(cur);
        rates
    }

    pub fn has_cpu_baseline(&self) -> bool {
        self.cpu.is_some()
    }

    pub fn has_network_baseline(&self) -> bool {
        self.network.is_some()
    }
}

// Shared test helpers: a scripted host and a recording command runner

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use vitality::config::SamplingConfig;
use vitality::error::ProbeError;
use vitality::models::*;
use vitality::probe::{CommandRunner, HostSource};

/// Host whose counter probes replay a script (one entry per call; `None` or an
/// exhausted script is a probe failure) and whose other probes return fixed values
/// (`None` is a failure).
#[derive(Default)]
pub struct FakeSource {
    pub cpu: Mutex<VecDeque<Option<CpuTicks>>>,
    pub network: Mutex<VecDeque<Option<NetworkCounters>>>,
    pub memory: Option<f64>,
    pub battery: Option<BatteryInfo>,
    pub uptime: Option<Duration>,
    pub thermal: Option<ThermalState>,
    pub disks: Option<Vec<Disk>>,
    pub cpu_rows: Option<Vec<ProcessRow>>,
    pub memory_rows: Option<Vec<ProcessRow>>,
    pub cpu_calls: AtomicUsize,
}

fn scripted<T: Copy>(
    script: &Mutex<VecDeque<Option<T>>>,
    what: &'static str,
) -> Result<T, ProbeError> {
    script
        .lock()
        .unwrap()
        .pop_front()
        .flatten()
        .ok_or(ProbeError::Missing(what))
}

fn fixed<T: Clone>(value: &Option<T>, what: &'static str) -> Result<T, ProbeError> {
    value.clone().ok_or(ProbeError::Missing(what))
}

impl FakeSource {
    /// Every probe succeeds once; counter scripts hold a single sample.
    pub fn healthy() -> Self {
        Self {
            cpu: Mutex::new(VecDeque::from([Some(ticks(100, 100, 800))])),
            network: Mutex::new(VecDeque::from([Some(counters(1_000, 2_000))])),
            memory: Some(0.42),
            battery: Some(BatteryInfo {
                health: 0.9,
                cycle_count: 321,
            }),
            uptime: Some(Duration::from_secs(2 * 86_400 + 3 * 3_600 + 4 * 60)),
            thermal: Some(ThermalState::Fair),
            disks: Some(vec![disk("disk3", "Macintosh HD", "/", true)]),
            cpu_rows: Some(vec![
                ProcessRow::cpu(10, "/Applications/Safari.app/Contents/MacOS/Safari", 20.0),
                ProcessRow::cpu(11, "/usr/bin/python3", 3.0),
            ]),
            memory_rows: Some(vec![
                ProcessRow::memory(Some(10), "Safari", 800.0),
                ProcessRow::memory(Some(11), "python3", 120.0),
            ]),
            cpu_calls: AtomicUsize::new(0),
        }
    }

    /// Every probe fails.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_cpu_script(self, script: impl IntoIterator<Item = Option<CpuTicks>>) -> Self {
        *self.cpu.lock().unwrap() = script.into_iter().collect();
        self
    }

    pub fn with_network_script(
        self,
        script: impl IntoIterator<Item = Option<NetworkCounters>>,
    ) -> Self {
        *self.network.lock().unwrap() = script.into_iter().collect();
        self
    }

    pub fn cpu_calls(&self) -> usize {
        self.cpu_calls.load(Ordering::SeqCst)
    }
}

impl HostSource for FakeSource {
    async fn cpu_ticks(&self) -> Result<CpuTicks, ProbeError> {
        self.cpu_calls.fetch_add(1, Ordering::SeqCst);
        scripted(&self.cpu, "cpu ticks")
    }

    async fn memory_usage(&self) -> Result<f64, ProbeError> {
        fixed(&self.memory, "memory")
    }

    async fn battery(&self) -> Result<BatteryInfo, ProbeError> {
        fixed(&self.battery, "battery")
    }

    async fn uptime(&self) -> Result<Duration, ProbeError> {
        fixed(&self.uptime, "uptime")
    }

    async fn thermal_state(&self) -> Result<ThermalState, ProbeError> {
        fixed(&self.thermal, "thermal")
    }

    async fn network_counters(&self) -> Result<NetworkCounters, ProbeError> {
        scripted(&self.network, "network counters")
    }

    async fn disks(&self) -> Result<Vec<Disk>, ProbeError> {
        fixed(&self.disks, "disks")
    }

    async fn cpu_processes(&self) -> Result<Vec<ProcessRow>, ProbeError> {
        fixed(&self.cpu_rows, "cpu processes")
    }

    async fn memory_processes(&self) -> Result<Vec<ProcessRow>, ProbeError> {
        fixed(&self.memory_rows, "memory processes")
    }
}

/// Runner that records every invocation and answers with a fixed result.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
    pub fail: bool,
}

impl RecordingRunner {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        self.calls.lock().unwrap().push((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));
        if self.fail {
            Err(ProbeError::Timeout {
                program: program.to_string(),
                timeout: Duration::from_millis(1),
            })
        } else {
            Ok(String::new())
        }
    }
}

pub fn ticks(user: u64, system: u64, idle: u64) -> CpuTicks {
    CpuTicks {
        user,
        system,
        idle,
        nice: 0,
    }
}

pub fn counters(received: u64, transmitted: u64) -> NetworkCounters {
    NetworkCounters {
        received,
        transmitted,
    }
}

pub fn disk(identifier: &str, name: &str, mount: &str, internal: bool) -> Disk {
    Disk {
        identifier: identifier.into(),
        name: name.into(),
        mount_path: mount.into(),
        is_internal: internal,
        is_ejectable: !internal,
        total_bytes: 1_000_000,
        used_bytes: 400_000,
    }
}

pub fn sampling(history_capacity: usize, top_n: usize) -> SamplingConfig {
    SamplingConfig {
        interval_ms: 25,
        history_capacity,
        top_n,
        stats_log_interval_secs: 3600,
    }
}

// Published snapshot

use serde::{Deserialize, Serialize};

use super::{Disk, Process};

/// Host thermal pressure level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalState {
    #[default]
    Nominal,
    Fair,
    Serious,
    Critical,
    #[serde(other)]
    Unknown,
}

impl ThermalState {
    /// Map a numeric pressure level (0 = nominal .. 4 = sleeping) onto the four buckets.
    pub fn from_pressure_level(level: i64) -> Self {
        match level {
            0 => ThermalState::Nominal,
            1 => ThermalState::Fair,
            2 => ThermalState::Serious,
            3 | 4 => ThermalState::Critical,
            _ => ThermalState::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThermalState::Nominal => "Nominal",
            ThermalState::Fair => "Fair",
            ThermalState::Serious => "Serious",
            ThermalState::Critical => "Critical",
            ThermalState::Unknown => "Unknown",
        }
    }
}

/// Point-in-time view of the host. Replaced wholesale on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Monotonic per engine; 0 is the empty snapshot published before the first tick.
    pub sequence: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub battery_health: f64,
    pub battery_cycles: u32,
    pub uptime_secs: u64,
    pub uptime_text: String,
    pub thermal_state: ThermalState,
    pub disks: Vec<Disk>,
    pub top_cpu_apps: Vec<Process>,
    pub top_memory_apps: Vec<Process>,
    pub network_rx_bytes_per_sec: f64,
    pub network_tx_bytes_per_sec: f64,
    /// Oldest first.
    pub cpu_history: Vec<f64>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            sequence: 0,
            timestamp: 0,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            battery_health: 0.0,
            battery_cycles: 0,
            uptime_secs: 0,
            uptime_text: crate::probe::UPTIME_UNAVAILABLE.to_string(),
            thermal_state: ThermalState::Nominal,
            disks: vec![],
            top_cpu_apps: vec![],
            top_memory_apps: vec![],
            network_rx_bytes_per_sec: 0.0,
            network_tx_bytes_per_sec: 0.0,
            cpu_history: vec![],
        }
    }
}

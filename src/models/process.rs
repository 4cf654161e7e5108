// Process rows (raw) and ranked per-application entries

use serde::{Deserialize, Serialize};

/// One row from a process listing utility. Only one of `cpu_percent` / `memory_mb`
/// is meaningful, depending on which listing produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRow {
    pub pid: Option<u32>,
    /// Raw command as printed by the utility: a full executable path or a bare name.
    pub command: String,
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

impl ProcessRow {
    pub fn cpu(pid: u32, command: impl Into<String>, cpu_percent: f64) -> Self {
        Self {
            pid: Some(pid),
            command: command.into(),
            cpu_percent,
            memory_mb: 0.0,
        }
    }

    pub fn memory(pid: Option<u32>, command: impl Into<String>, memory_mb: f64) -> Self {
        Self {
            pid,
            command: command.into(),
            cpu_percent: 0.0,
            memory_mb,
        }
    }
}

/// A ranked application entry. `pid` is `None` when several processes were merged
/// under one name and no single pid represents the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub pid: Option<u32>,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

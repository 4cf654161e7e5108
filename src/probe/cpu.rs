// CPU tick counters

use crate::error::ProbeError;
use crate::models::CpuTicks;

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// Columns are user, nice, system, idle, iowait, irq, softirq, steal. iowait is
/// folded into idle and irq/softirq/steal into system so that the four-counter
/// model still sums to the full tick count.
pub fn parse_proc_stat(content: &str) -> Result<CpuTicks, ProbeError> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| ProbeError::parse("/proc/stat", "no aggregate cpu line"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| ProbeError::parse("/proc/stat", e.to_string()))?;
    if fields.len() < 4 {
        return Err(ProbeError::parse(
            "/proc/stat",
            format!("expected at least 4 counters, got {}", fields.len()),
        ));
    }
    let at = |i: usize| fields.get(i).copied().unwrap_or(0);

    Ok(CpuTicks {
        user: at(0),
        nice: at(1),
        system: at(2)
            .saturating_add(at(5))
            .saturating_add(at(6))
            .saturating_add(at(7)),
        idle: at(3).saturating_add(at(4)),
    })
}

#[cfg(target_os = "linux")]
pub(super) fn read_cpu_ticks() -> Result<CpuTicks, ProbeError> {
    let content = super::linux::read_proc("/proc/stat")?;
    parse_proc_stat(&content)
}

#[cfg(target_os = "macos")]
pub(super) fn read_cpu_ticks() -> Result<CpuTicks, ProbeError> {
    super::macos::host_cpu_ticks()
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub(super) fn read_cpu_ticks() -> Result<CpuTicks, ProbeError> {
    Err(ProbeError::Unsupported("cpu tick counters"))
}

// Linux-specific helpers: /proc and /sys/class/power_supply.

use std::path::{Path, PathBuf};

use crate::error::ProbeError;
use crate::models::BatteryInfo;

use super::battery::battery_health;

pub(super) const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// Read a procfs/sysfs file, mapping IO errors to a launch failure on that path.
pub(super) fn read_proc(path: &str) -> Result<String, ProbeError> {
    std::fs::read_to_string(path).map_err(|source| ProbeError::Launch {
        program: path.to_string(),
        source,
    })
}

fn read_u64(dir: &Path, name: &str) -> Option<u64> {
    std::fs::read_to_string(dir.join(name))
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// First `power_supply` entry whose `type` is `Battery`.
pub(super) fn find_battery_dir(root: &Path) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .collect();
    entries.sort();
    entries.into_iter().find(|dir| {
        std::fs::read_to_string(dir.join("type"))
            .map(|t| t.trim() == "Battery")
            .unwrap_or(false)
    })
}

/// Battery health from a power_supply directory. Drivers expose either charge_* (µAh)
/// or energy_* (µWh) counters; both ratios are equivalent.
pub(super) fn read_sysfs_battery(dir: &Path) -> Result<BatteryInfo, ProbeError> {
    let (full, design) = match (
        read_u64(dir, "charge_full"),
        read_u64(dir, "charge_full_design"),
    ) {
        (Some(f), Some(d)) => (f, d),
        _ => (
            read_u64(dir, "energy_full").ok_or(ProbeError::Missing("battery full capacity"))?,
            read_u64(dir, "energy_full_design")
                .ok_or(ProbeError::Missing("battery design capacity"))?,
        ),
    };
    let cycle_count = read_u64(dir, "cycle_count").unwrap_or(0);
    Ok(BatteryInfo {
        health: battery_health(full, design),
        cycle_count: cycle_count.min(u32::MAX as u64) as u32,
    })
}

pub(super) fn read_battery() -> Result<BatteryInfo, ProbeError> {
    let dir = find_battery_dir(Path::new(POWER_SUPPLY_DIR)).ok_or(ProbeError::Missing("battery"))?;
    read_sysfs_battery(&dir)
}

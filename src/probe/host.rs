// Uptime formatting and thermal pressure

use crate::models::ThermalState;

pub const UPTIME_UNAVAILABLE: &str = "N/A";

/// Abbreviated day/hour/minute string, e.g. "2d 3h 4m". Zero-valued leading units are
/// omitted; minutes are always shown.
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{hours}h"));
    }
    parts.push(format!("{minutes}m"));
    parts.join(" ")
}

/// Parse `notifyutil -g com.apple.system.thermalpressurelevel`, whose output is
/// `com.apple.system.thermalpressurelevel <level>`.
pub fn parse_thermal_pressure(output: &str) -> ThermalState {
    output
        .split_whitespace()
        .last()
        .and_then(|v| v.parse::<i64>().ok())
        .map(ThermalState::from_pressure_level)
        .unwrap_or(ThermalState::Unknown)
}

/// Bucket sensor readings by how close the hottest one is to its critical threshold.
/// Sensors without a critical threshold are judged against 100 °C.
pub fn thermal_from_temperatures(readings: &[(f32, Option<f32>)]) -> ThermalState {
    let worst = readings
        .iter()
        .filter(|(t, _)| t.is_finite() && *t > 0.0)
        .map(|(t, crit)| {
            let crit = crit.filter(|c| c.is_finite() && *c > 0.0).unwrap_or(100.0);
            t / crit
        })
        .fold(None, |acc: Option<f32>, r| Some(acc.map_or(r, |a| a.max(r))));

    match worst {
        None => ThermalState::Unknown,
        Some(r) if r >= 1.0 => ThermalState::Critical,
        Some(r) if r >= 0.9 => ThermalState::Serious,
        Some(r) if r >= 0.75 => ThermalState::Fair,
        Some(_) => ThermalState::Nominal,
    }
}

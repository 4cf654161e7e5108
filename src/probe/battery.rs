// Battery health: ioreg smart-battery text (macOS) or power_supply sysfs (Linux)

use crate::models::BatteryInfo;

/// Health = max / design, clamped to [0, 1]. A zero design capacity counts as 1.
pub fn battery_health(max_capacity: u64, design_capacity: u64) -> f64 {
    let design = design_capacity.max(1);
    (max_capacity as f64 / design as f64).clamp(0.0, 1.0)
}

/// Scan `ioreg -rn AppleSmartBattery` output for capacity and cycle fields.
///
/// Only top-level `"Key" = value` lines count, so nested dictionaries such as
/// `"BatteryData" = {"DesignCapacity"=...}` and look-alike keys such as
/// `"DesignCycleCount9C"` are ignored. Missing capacities default to 1 and a
/// missing cycle count to 0. `AppleRawMaxCapacity` wins over `MaxCapacity`
/// because newer hosts report the latter as a percentage.
pub fn parse_ioreg_battery(output: &str) -> BatteryInfo {
    let mut max_capacity: Option<u64> = None;
    let mut raw_max_capacity: Option<u64> = None;
    let mut design_capacity: Option<u64> = None;
    let mut cycle_count: Option<u64> = None;

    for line in output.lines() {
        if let Some(v) = ioreg_value(line, "MaxCapacity") {
            max_capacity = Some(v);
        } else if let Some(v) = ioreg_value(line, "AppleRawMaxCapacity") {
            raw_max_capacity = Some(v);
        } else if let Some(v) = ioreg_value(line, "DesignCapacity") {
            design_capacity = Some(v);
        } else if let Some(v) = ioreg_value(line, "CycleCount") {
            cycle_count = Some(v);
        }
    }

    let max = raw_max_capacity.or(max_capacity).unwrap_or(1);
    let design = design_capacity.unwrap_or(1);
    BatteryInfo {
        health: battery_health(max, design),
        cycle_count: cycle_count.unwrap_or(0).min(u32::MAX as u64) as u32,
    }
}

/// First run of decimal digits after `=` on a `"key" = ...` line.
fn ioreg_value(line: &str, key: &str) -> Option<u64> {
    let rest = line.trim_start().strip_prefix('"')?.strip_prefix(key)?;
    let rest = rest.strip_prefix('"')?;
    let (_, value) = rest.split_once('=')?;
    first_digits(value)
}

pub(crate) fn first_digits(s: &str) -> Option<u64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IOREG: &str = r#"+-o AppleSmartBattery  <class AppleSmartBattery, id 0x100000a3f, registered, matched, active, busy 0 (0 ms), retain 8>
    {
      "TimeRemaining" = 312
      "AppleRawMaxCapacity" = 4512
      "MaxCapacity" = 100
      "CurrentCapacity" = 87
      "DesignCycleCount9C" = 1000
      "BatteryData" = {"DesignCapacity"=9999,"CycleCount"=1}
      "CycleCount" = 214
      "DesignCapacity" = 4790
      "AppleRawCurrentCapacity" = 3890
    }
"#;

    #[test]
    fn parse_ioreg_prefers_raw_max_capacity() {
        let info = parse_ioreg_battery(IOREG);
        assert!((info.health - 4512.0 / 4790.0).abs() < 1e-9);
        assert_eq!(info.cycle_count, 214);
    }

    #[test]
    fn parse_ioreg_uses_max_capacity_without_raw() {
        let out = "  \"MaxCapacity\" = 5000\n  \"DesignCapacity\" = 6000\n  \"CycleCount\" = 12\n";
        let info = parse_ioreg_battery(out);
        assert!((info.health - 5000.0 / 6000.0).abs() < 1e-9);
        assert_eq!(info.cycle_count, 12);
    }

    #[test]
    fn parse_ioreg_clamps_health_to_one() {
        let out = "\"MaxCapacity\" = 6500\n\"DesignCapacity\" = 6000\n";
        assert_eq!(parse_ioreg_battery(out).health, 1.0);
    }

    #[test]
    fn parse_ioreg_defaults_when_fields_missing() {
        let info = parse_ioreg_battery("");
        assert_eq!(info.health, 1.0);
        assert_eq!(info.cycle_count, 0);
    }

    #[test]
    fn battery_health_guards_zero_design() {
        assert_eq!(battery_health(0, 0), 0.0);
        assert_eq!(battery_health(5, 0), 1.0);
    }

    #[test]
    fn first_digits_takes_first_run() {
        assert_eq!(first_digits(" = 4512 (mAh) 7"), Some(4512));
        assert_eq!(first_digits("none"), None);
    }
}

// Memory pressure: vm_stat page counts (macOS) or sysinfo totals elsewhere

use crate::error::ProbeError;
use crate::models::VmPages;

/// Parse `vm_stat` output into page counts.
///
/// ```text
/// Mach Virtual Memory Statistics: (page size of 16384 bytes)
/// Pages free:                               12345.
/// Pages active:                            234567.
/// Pages wired down:                        111111.
/// Pages occupied by compressor:             55555.
/// ```
pub fn parse_vm_stat(output: &str) -> Result<VmPages, ProbeError> {
    let mut pages = VmPages::default();

    for line in output.lines() {
        if let Some(rest) = line.split("page size of ").nth(1) {
            pages.page_size = leading_number(rest).unwrap_or(0);
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Some(count) = leading_number(value.trim()) else {
            continue;
        };
        match key.trim() {
            "Pages free" => pages.free = count,
            "Pages active" => pages.active = count,
            "Pages inactive" => pages.inactive = count,
            "Pages wired down" => pages.wired = count,
            "Pages occupied by compressor" => pages.compressed = count,
            _ => {}
        }
    }

    if pages.page_size == 0 {
        return Err(ProbeError::Missing("vm_stat page size"));
    }
    if pages.active == 0 && pages.wired == 0 && pages.free == 0 {
        return Err(ProbeError::parse("vm_stat", "no page counters found"));
    }
    Ok(pages)
}

/// Used fraction of physical memory: (active + wired + compressed) × page size / total.
pub fn memory_fraction(pages: &VmPages, total_physical_bytes: u64) -> f64 {
    used_fraction(pages.used_bytes(), total_physical_bytes)
}

pub fn used_fraction(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64).clamp(0.0, 1.0)
}

fn leading_number(s: &str) -> Option<u64> {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

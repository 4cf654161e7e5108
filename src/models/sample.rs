// Raw counter samples read by the probes. Not published.

/// Cumulative CPU tick counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub system: u64,
    pub idle: u64,
    pub nice: u64,
}

impl CpuTicks {
    pub fn total(&self) -> u64 {
        self.user
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.nice)
    }
}

/// Cumulative byte counters summed over every interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkCounters {
    pub received: u64,
    pub transmitted: u64,
}

/// Virtual-memory page counts as reported by `vm_stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VmPages {
    pub page_size: u64,
    pub free: u64,
    pub active: u64,
    pub inactive: u64,
    pub wired: u64,
    pub compressed: u64,
}

impl VmPages {
    /// Bytes in use: (active + wired + compressed) pages.
    pub fn used_bytes(&self) -> u64 {
        self.active
            .saturating_add(self.wired)
            .saturating_add(self.compressed)
            .saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryInfo {
    /// Max capacity / design capacity, clamped to [0, 1].
    pub health: f64,
    pub cycle_count: u32,
}

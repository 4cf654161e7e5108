use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub probes: ProbeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Number of CPU utilization samples kept in the snapshot history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Ranked applications kept per list.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// How often to log worker stats (ticks, probe failures, subscribers) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_history_capacity() -> usize {
    60
}

fn default_top_n() -> usize {
    5
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            history_capacity: default_history_capacity(),
            top_n: default_top_n(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Upper bound on any single external utility invocation.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Rows requested from the per-process memory listing.
    #[serde(default = "default_memory_process_limit")]
    pub memory_process_limit: usize,
}

fn default_command_timeout_ms() -> u64 {
    3000
}

fn default_memory_process_limit() -> usize {
    20
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
            memory_process_limit: default_memory_process_limit(),
        }
    }
}

pub const HISTORY_CAPACITY_RANGE: std::ops::RangeInclusive<usize> = 50..=60;
pub const TOP_N_RANGE: std::ops::RangeInclusive<usize> = 3..=5;

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.sampling.interval_ms > 0,
            "sampling.interval_ms must be > 0, got {}",
            self.sampling.interval_ms
        );
        anyhow::ensure!(
            HISTORY_CAPACITY_RANGE.contains(&self.sampling.history_capacity),
            "sampling.history_capacity must be between {} and {}, got {}",
            HISTORY_CAPACITY_RANGE.start(),
            HISTORY_CAPACITY_RANGE.end(),
            self.sampling.history_capacity
        );
        anyhow::ensure!(
            TOP_N_RANGE.contains(&self.sampling.top_n),
            "sampling.top_n must be between {} and {}, got {}",
            TOP_N_RANGE.start(),
            TOP_N_RANGE.end(),
            self.sampling.top_n
        );
        anyhow::ensure!(
            self.sampling.stats_log_interval_secs > 0,
            "sampling.stats_log_interval_secs must be > 0, got {}",
            self.sampling.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.probes.command_timeout_ms > 0,
            "probes.command_timeout_ms must be > 0, got {}",
            self.probes.command_timeout_ms
        );
        anyhow::ensure!(
            self.probes.memory_process_limit >= self.sampling.top_n,
            "probes.memory_process_limit must be >= sampling.top_n ({}), got {}",
            self.sampling.top_n,
            self.probes.memory_process_limit
        );
        Ok(())
    }
}

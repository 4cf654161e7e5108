// Probe adapters: one per host data source.
// Parsers are pure functions in the per-source modules; this module wires them to
// real utilities (through `CommandRunner`) and to sysinfo handles.

mod battery;
mod command;
mod cpu;
mod disks;
mod host;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
mod memory;
mod network;
mod processes;

pub use battery::{battery_health, parse_ioreg_battery};
pub use command::{CommandRunner, TokioCommandRunner};
pub use cpu::parse_proc_stat;
pub use disks::{
    BOOT_VOLUME_NAME, IGNORED_VOLUME_NAMES, is_browsable_mount, is_listed,
    parse_diskutil_ejectable, parse_diskutil_identifier, parse_lsblk_ejectable,
    parse_lsblk_identifier, plist_string,
};
pub use host::{
    UPTIME_UNAVAILABLE, format_uptime, parse_thermal_pressure, thermal_from_temperatures,
};
pub use memory::{memory_fraction, parse_vm_stat, used_fraction};
pub use network::parse_netstat_ib;
pub use processes::{parse_memory_mb, parse_ps_cpu, parse_ps_rss, parse_top_memory};

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use sysinfo::{Components, Disks, Networks, System};
use tracing::{instrument, warn};

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::models::{
    BatteryInfo, CpuTicks, Disk, NetworkCounters, ProcessRow, ThermalState, Volume,
};

/// Everything one tick reads from the host. Each call is independent of the others
/// and may run concurrently with them.
pub trait HostSource: Send + Sync + 'static {
    fn cpu_ticks(&self) -> impl Future<Output = Result<CpuTicks, ProbeError>> + Send;

    /// Used fraction of physical memory, in [0, 1].
    fn memory_usage(&self) -> impl Future<Output = Result<f64, ProbeError>> + Send;

    fn battery(&self) -> impl Future<Output = Result<BatteryInfo, ProbeError>> + Send;

    fn uptime(&self) -> impl Future<Output = Result<Duration, ProbeError>> + Send;

    fn thermal_state(&self) -> impl Future<Output = Result<ThermalState, ProbeError>> + Send;

    fn network_counters(&self)
    -> impl Future<Output = Result<NetworkCounters, ProbeError>> + Send;

    /// Listed (already filtered) disks with identity and ejectability resolved.
    fn disks(&self) -> impl Future<Output = Result<Vec<Disk>, ProbeError>> + Send;

    /// pid / cpu% / command rows for every process.
    fn cpu_processes(&self) -> impl Future<Output = Result<Vec<ProcessRow>, ProbeError>> + Send;

    /// pid / memory / command rows for the heaviest processes.
    fn memory_processes(
        &self,
    ) -> impl Future<Output = Result<Vec<ProcessRow>, ProbeError>> + Send;
}

#[cfg(target_os = "macos")]
mod utility {
    pub const IOREG: &str = "/usr/sbin/ioreg";
    pub const VM_STAT: &str = "/usr/bin/vm_stat";
    pub const NETSTAT: &str = "/usr/sbin/netstat";
    pub const DISKUTIL: &str = "/usr/sbin/diskutil";
    pub const NOTIFYUTIL: &str = "/usr/bin/notifyutil";
    pub const TOP: &str = "/usr/bin/top";
    pub const PS: &str = "/bin/ps";
}

#[cfg(not(target_os = "macos"))]
mod utility {
    pub const LSBLK: &str = "lsblk";
    pub const PS: &str = "ps";
}

/// The real host: external utilities plus persistent sysinfo handles.
pub struct SystemSource<R: CommandRunner = TokioCommandRunner> {
    runner: R,
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
    #[cfg_attr(target_os = "macos", allow(dead_code))]
    networks: Arc<Mutex<Networks>>,
    #[cfg_attr(target_os = "macos", allow(dead_code))]
    components: Arc<Mutex<Components>>,
    memory_process_limit: usize,
}

impl SystemSource<TokioCommandRunner> {
    pub fn new(config: &ProbeConfig) -> Self {
        Self::with_runner(
            TokioCommandRunner::new(Duration::from_millis(config.command_timeout_ms)),
            config.memory_process_limit,
        )
    }
}

fn lock<'a, T>(m: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ProbeError> {
    m.lock()
        .map_err(|e| ProbeError::Join(format!("sysinfo {what} lock poisoned: {e}")))
}

impl<R: CommandRunner> SystemSource<R> {
    pub fn with_runner(runner: R, memory_process_limit: usize) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self {
            runner,
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
            components: Arc::new(Mutex::new(Components::new_with_refreshed_list())),
            memory_process_limit,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn total_memory(&self) -> Result<u64, ProbeError> {
        let sys = self.sys.clone();
        tokio::task::spawn_blocking(move || {
            let mut sys = lock(&sys, "system")?;
            sys.refresh_memory();
            Ok(sys.total_memory())
        })
        .await?
    }

    async fn volumes(&self) -> Result<Vec<Volume>, ProbeError> {
        let disks = self.disks.clone();
        tokio::task::spawn_blocking(move || {
            let mut disks = lock(&disks, "disks")?;
            disks.refresh(true);
            Ok(disks
                .list()
                .iter()
                .map(|d| {
                    let mount_path = d.mount_point().to_string_lossy().into_owned();
                    let file_system = d.file_system().to_string_lossy().into_owned();
                    let device = d.name().to_string_lossy().into_owned();
                    Volume {
                        name: volume_name(&device, &mount_path),
                        is_browsable: is_browsable_mount(&mount_path, &file_system),
                        is_internal: !d.is_removable(),
                        total_bytes: d.total_space(),
                        available_bytes: d.available_space(),
                        mount_path,
                        device,
                    }
                })
                .collect())
        })
        .await?
    }

    #[cfg(target_os = "macos")]
    async fn describe_disk(&self, volume: &Volume) -> Result<(String, bool), ProbeError> {
        let xml = self
            .runner
            .run(utility::DISKUTIL, &["info", "-plist", volume.mount_path.as_str()])
            .await?;
        let identifier =
            parse_diskutil_identifier(&xml).ok_or(ProbeError::Missing("disk identifier"))?;
        let device = format!("/dev/{identifier}");
        let ejectable = match self
            .runner
            .run(utility::DISKUTIL, &["info", "-plist", device.as_str()])
            .await
        {
            Ok(xml) => parse_diskutil_ejectable(&xml).unwrap_or(false),
            Err(e) => {
                warn!(error = %e, device = %device, operation = "describe_disk", "ejectable lookup failed");
                false
            }
        };
        Ok((identifier, ejectable))
    }

    #[cfg(not(target_os = "macos"))]
    async fn describe_disk(&self, volume: &Volume) -> Result<(String, bool), ProbeError> {
        if !volume.device.starts_with("/dev/") {
            return Err(ProbeError::Missing("block device"));
        }
        let json = self
            .runner
            .run(
                utility::LSBLK,
                &["-J", "-o", "NAME,PKNAME,RM,HOTPLUG", volume.device.as_str()],
            )
            .await?;
        let identifier =
            parse_lsblk_identifier(&json).ok_or(ProbeError::Missing("disk identifier"))?;
        let device = format!("/dev/{identifier}");
        let ejectable = match self
            .runner
            .run(utility::LSBLK, &["-J", "-d", "-o", "NAME,RM,HOTPLUG", device.as_str()])
            .await
        {
            Ok(json) => parse_lsblk_ejectable(&json).unwrap_or(false),
            Err(e) => {
                warn!(error = %e, device = %device, operation = "describe_disk", "ejectable lookup failed");
                false
            }
        };
        Ok((identifier, ejectable))
    }
}

impl<R: CommandRunner> SystemSource<R> {
    /// Resolve a listed volume to a `Disk`. A failed describe falls back to the volume's
    /// own device name and reports it as not ejectable.
    pub async fn describe_volume(&self, volume: &Volume) -> Disk {
        let (identifier, ejectable) = match self.describe_disk(volume).await {
            Ok(described) => described,
            Err(e) => {
                warn!(
                    error = %e,
                    mount = %volume.mount_path,
                    operation = "describe_disk",
                    "disk describe failed; using volume device"
                );
                let fallback = volume.device.trim_start_matches("/dev/").to_string();
                (fallback, false)
            }
        };
        Disk::from_volume(volume, identifier, ejectable)
    }
}

/// Display name for a volume. sysinfo reports the volume label on macOS; elsewhere the
/// device node is all it has, so the mount point's last component is used instead.
fn volume_name(device: &str, mount_path: &str) -> String {
    if cfg!(target_os = "macos") && !device.is_empty() {
        return device.to_string();
    }
    std::path::Path::new(mount_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| mount_path.to_string())
}

impl<R: CommandRunner> HostSource for SystemSource<R> {
    #[instrument(skip(self), fields(probe = "system", operation = "cpu_ticks"))]
    async fn cpu_ticks(&self) -> Result<CpuTicks, ProbeError> {
        tokio::task::spawn_blocking(cpu::read_cpu_ticks).await?
    }

    #[cfg(target_os = "macos")]
    #[instrument(skip(self), fields(probe = "system", operation = "memory_usage"))]
    async fn memory_usage(&self) -> Result<f64, ProbeError> {
        let output = self.runner.run(utility::VM_STAT, &[]).await?;
        let pages = parse_vm_stat(&output)?;
        let total = self.total_memory().await?;
        Ok(memory_fraction(&pages, total))
    }

    #[cfg(not(target_os = "macos"))]
    #[instrument(skip(self), fields(probe = "system", operation = "memory_usage"))]
    async fn memory_usage(&self) -> Result<f64, ProbeError> {
        let total = self.total_memory().await?;
        let sys = self.sys.clone();
        let available = tokio::task::spawn_blocking(move || {
            let sys = lock(&sys, "system")?;
            Ok::<_, ProbeError>(sys.available_memory())
        })
        .await??;
        Ok(used_fraction(total.saturating_sub(available), total))
    }

    #[cfg(target_os = "macos")]
    #[instrument(skip(self), fields(probe = "system", operation = "battery"))]
    async fn battery(&self) -> Result<BatteryInfo, ProbeError> {
        let output = self
            .runner
            .run(utility::IOREG, &["-rn", "AppleSmartBattery"])
            .await?;
        Ok(parse_ioreg_battery(&output))
    }

    #[cfg(target_os = "linux")]
    #[instrument(skip(self), fields(probe = "system", operation = "battery"))]
    async fn battery(&self) -> Result<BatteryInfo, ProbeError> {
        tokio::task::spawn_blocking(linux::read_battery).await?
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    async fn battery(&self) -> Result<BatteryInfo, ProbeError> {
        Err(ProbeError::Unsupported("battery"))
    }

    #[instrument(skip(self), fields(probe = "system", operation = "uptime"))]
    async fn uptime(&self) -> Result<Duration, ProbeError> {
        match System::uptime() {
            0 => Err(ProbeError::Missing("uptime")),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    #[cfg(target_os = "macos")]
    #[instrument(skip(self), fields(probe = "system", operation = "thermal_state"))]
    async fn thermal_state(&self) -> Result<ThermalState, ProbeError> {
        let output = self
            .runner
            .run(
                utility::NOTIFYUTIL,
                &["-g", "com.apple.system.thermalpressurelevel"],
            )
            .await?;
        Ok(parse_thermal_pressure(&output))
    }

    #[cfg(not(target_os = "macos"))]
    #[instrument(skip(self), fields(probe = "system", operation = "thermal_state"))]
    async fn thermal_state(&self) -> Result<ThermalState, ProbeError> {
        let components = self.components.clone();
        tokio::task::spawn_blocking(move || {
            let mut components = lock(&components, "components")?;
            components.refresh(false);
            let readings: Vec<(f32, Option<f32>)> = components
                .list()
                .iter()
                .filter_map(|c| Some((c.temperature()?, c.critical())))
                .collect();
            Ok(thermal_from_temperatures(&readings))
        })
        .await?
    }

    #[cfg(target_os = "macos")]
    #[instrument(skip(self), fields(probe = "system", operation = "network_counters"))]
    async fn network_counters(&self) -> Result<NetworkCounters, ProbeError> {
        let output = self.runner.run(utility::NETSTAT, &["-ib"]).await?;
        parse_netstat_ib(&output)
    }

    #[cfg(not(target_os = "macos"))]
    #[instrument(skip(self), fields(probe = "system", operation = "network_counters"))]
    async fn network_counters(&self) -> Result<NetworkCounters, ProbeError> {
        let networks = self.networks.clone();
        tokio::task::spawn_blocking(move || {
            let mut networks = lock(&networks, "networks")?;
            networks.refresh(true);
            Ok(networks
                .list()
                .values()
                .fold(NetworkCounters::default(), |acc, data| NetworkCounters {
                    received: acc.received.saturating_add(data.total_received()),
                    transmitted: acc.transmitted.saturating_add(data.total_transmitted()),
                }))
        })
        .await?
    }

    #[instrument(skip(self), fields(probe = "system", operation = "disks"))]
    async fn disks(&self) -> Result<Vec<Disk>, ProbeError> {
        let volumes = self.volumes().await?;
        let mut disks = Vec::new();
        for volume in volumes.iter().filter(|v| is_listed(v)) {
            disks.push(self.describe_volume(volume).await);
        }
        Ok(disks)
    }

    #[instrument(skip(self), fields(probe = "system", operation = "cpu_processes"))]
    async fn cpu_processes(&self) -> Result<Vec<ProcessRow>, ProbeError> {
        let output = self
            .runner
            .run(utility::PS, &["-Ao", "pid=,pcpu=,comm="])
            .await?;
        let rows = parse_ps_cpu(&output);
        if rows.is_empty() {
            return Err(ProbeError::parse("ps", "no process rows"));
        }
        Ok(rows)
    }

    #[cfg(target_os = "macos")]
    #[instrument(skip(self), fields(probe = "system", operation = "memory_processes"))]
    async fn memory_processes(&self) -> Result<Vec<ProcessRow>, ProbeError> {
        let limit = self.memory_process_limit.to_string();
        let output = self
            .runner
            .run(
                utility::TOP,
                &["-l", "1", "-o", "mem", "-n", limit.as_str(), "-stats", "pid,mem,command"],
            )
            .await?;
        let rows = parse_top_memory(&output);
        if rows.is_empty() {
            return Err(ProbeError::parse("top", "no process rows"));
        }
        Ok(rows)
    }

    #[cfg(not(target_os = "macos"))]
    #[instrument(skip(self), fields(probe = "system", operation = "memory_processes"))]
    async fn memory_processes(&self) -> Result<Vec<ProcessRow>, ProbeError> {
        let output = self
            .runner
            .run(utility::PS, &["-Ao", "pid=,rss=,comm="])
            .await?;
        let mut rows = parse_ps_rss(&output);
        if rows.is_empty() {
            return Err(ProbeError::parse("ps", "no process rows"));
        }
        rows.sort_by(|a, b| b.memory_mb.total_cmp(&a.memory_mb));
        rows.truncate(self.memory_process_limit);
        Ok(rows)
    }
}

// Domain models: published snapshot + raw probe samples

mod disk;
mod process;
mod sample;
mod snapshot;

pub use disk::{Disk, Volume};
pub use process::{Process, ProcessRow};
pub use sample::{BatteryInfo, CpuTicks, NetworkCounters, VmPages};
pub use snapshot::{Snapshot, ThermalState};

// macOS-specific helpers: Mach host statistics.

use crate::error::ProbeError;
use crate::models::CpuTicks;

/// Read the host-wide CPU tick counters via `host_statistics(HOST_CPU_LOAD_INFO)`.
#[allow(deprecated)]
pub(super) fn host_cpu_ticks() -> Result<CpuTicks, ProbeError> {
    let mut info = std::mem::MaybeUninit::<libc::host_cpu_load_info>::zeroed();
    let mut count = (std::mem::size_of::<libc::host_cpu_load_info>()
        / std::mem::size_of::<libc::integer_t>()) as libc::mach_msg_type_number_t;

    // SAFETY: `info` is a zeroed buffer of exactly HOST_CPU_LOAD_INFO's size and `count`
    // holds its length in integer_t units, as host_statistics requires.
    let result = unsafe {
        libc::host_statistics(
            libc::mach_host_self(),
            libc::HOST_CPU_LOAD_INFO,
            info.as_mut_ptr() as libc::host_info_t,
            &mut count,
        )
    };
    if result != libc::KERN_SUCCESS {
        return Err(ProbeError::parse(
            "host_statistics",
            format!("kern_return_t {result}"),
        ));
    }
    // SAFETY: host_statistics returned KERN_SUCCESS and filled the struct.
    let info = unsafe { info.assume_init() };
    let ticks = info.cpu_ticks;
    Ok(CpuTicks {
        user: ticks[libc::CPU_STATE_USER as usize] as u64,
        system: ticks[libc::CPU_STATE_SYSTEM as usize] as u64,
        idle: ticks[libc::CPU_STATE_IDLE as usize] as u64,
        nice: ticks[libc::CPU_STATE_NICE as usize] as u64,
    })
}

// Disk eject and process kill. Outcomes are logged; callers get a Result but nothing
// here panics or retries.

use std::time::Duration;

use crate::error::ActionError;
use crate::probe::{CommandRunner, TokioCommandRunner};

/// Ejecting can wait on the disk to flush; this is much longer than a probe timeout.
pub const EJECT_TIMEOUT: Duration = Duration::from_secs(30);

#[cfg(target_os = "macos")]
const EJECT_PROGRAM: &str = "/usr/sbin/diskutil";
#[cfg(not(target_os = "macos"))]
const EJECT_PROGRAM: &str = "eject";

pub struct ActionGateway<R: CommandRunner = TokioCommandRunner> {
    runner: R,
    own_pid: u32,
}

impl Default for ActionGateway<TokioCommandRunner> {
    fn default() -> Self {
        Self::new(TokioCommandRunner::new(EJECT_TIMEOUT))
    }
}

impl<R: CommandRunner> ActionGateway<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            own_pid: std::process::id(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Arguments for the platform eject utility. `target` is a mount path or a disk
    /// identifier as reported in `Disk::identifier`.
    pub fn eject_args(target: &str) -> Result<Vec<String>, ActionError> {
        let target = target.trim();
        if target.is_empty() || target == "/" {
            return Err(ActionError::InvalidTarget(format!("eject target {target:?}")));
        }
        if cfg!(target_os = "macos") {
            Ok(vec!["eject".to_string(), target.to_string()])
        } else if target.starts_with('/') {
            Ok(vec![target.to_string()])
        } else {
            Ok(vec![format!("/dev/{target}")])
        }
    }

    pub async fn eject(&self, target: &str) -> Result<(), ActionError> {
        let result = self.try_eject(target).await;
        match &result {
            Ok(()) => tracing::info!(disk = target, operation = "eject", "volume ejected"),
            Err(e) => tracing::warn!(error = %e, disk = target, operation = "eject", "eject failed"),
        }
        result
    }

    async fn try_eject(&self, target: &str) -> Result<(), ActionError> {
        let args = Self::eject_args(target)?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run(EJECT_PROGRAM, &args).await?;
        Ok(())
    }

    /// Refuses the idle/kernel pid 0, init (1) and this process.
    pub fn check_kill_target(&self, pid: u32) -> Result<i32, ActionError> {
        if pid <= 1 || pid == self.own_pid {
            return Err(ActionError::InvalidTarget(format!("pid {pid}")));
        }
        i32::try_from(pid).map_err(|_| ActionError::InvalidTarget(format!("pid {pid}")))
    }

    /// Send SIGKILL to `pid`.
    pub fn kill_process(&self, pid: u32) -> Result<(), ActionError> {
        let result = self.check_kill_target(pid).and_then(|raw| send_kill(pid, raw));
        match &result {
            Ok(()) => tracing::info!(pid, operation = "kill_process", "process killed"),
            Err(e) => tracing::warn!(error = %e, pid, operation = "kill_process", "kill failed"),
        }
        result
    }
}

#[cfg(unix)]
fn send_kill(pid: u32, raw: i32) -> Result<(), ActionError> {
    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(raw, libc::SIGKILL) };
    if rc == 0 {
        Ok(())
    } else {
        Err(ActionError::Signal {
            pid,
            source: std::io::Error::last_os_error(),
        })
    }
}

#[cfg(not(unix))]
fn send_kill(_pid: u32, _raw: i32) -> Result<(), ActionError> {
    Err(crate::error::ProbeError::Unsupported("kill").into())
}

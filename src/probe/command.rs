// External utility execution with a bounded timeout.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use crate::error::ProbeError;

/// Runs an external utility and returns its stdout.
///
/// Launch failures, timeouts and non-zero exits are all reported as `ProbeError`;
/// callers treat every variant the same way (neutral value, log, carry on).
pub trait CommandRunner: Send + Sync + 'static {
    fn run(
        &self,
        program: &str,
        args: &[&str],
    ) -> impl Future<Output = Result<String, ProbeError>> + Send;
}

/// Spawns real processes through tokio. The child is killed if the timeout elapses.
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Launch {
                program: program.to_string(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProbeError::Timeout {
                program: program.to_string(),
                timeout: self.timeout,
            })?
            .map_err(|source| ProbeError::Launch {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::ExitStatus {
                program: program.to_string(),
                status: output.status,
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

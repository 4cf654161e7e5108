// Probe and action error types.
// None of these ever reach a subscriber: the worker logs them and substitutes a neutral value.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The external utility could not be started (missing binary, permission denied).
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}")]
    ExitStatus {
        program: String,
        status: std::process::ExitStatus,
    },

    /// Output was produced but did not have the expected shape.
    #[error("unparsable {source_name} output: {reason}")]
    Parse {
        source_name: &'static str,
        reason: String,
    },

    /// Output parsed but the expected field was absent (e.g. no battery).
    #[error("{0} not present")]
    Missing(&'static str),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("blocking probe task failed: {0}")]
    Join(String),
}

impl ProbeError {
    pub(crate) fn parse(source_name: &'static str, reason: impl Into<String>) -> Self {
        ProbeError::Parse {
            source_name,
            reason: reason.into(),
        }
    }
}

impl From<tokio::task::JoinError> for ProbeError {
    fn from(e: tokio::task::JoinError) -> Self {
        ProbeError::Join(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("refusing to act on {0}")]
    InvalidTarget(String),

    #[error("eject failed: {0}")]
    Command(#[from] ProbeError),

    #[error("kill({pid}) failed: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

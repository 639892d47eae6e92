use std::io;
use thiserror::Error;

/// Failures inside the spawn machinery, as opposed to the child's own status.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to open the {stream} pipes: {source}")]
    Pipe {
        stream: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{what} contains an interior NUL byte")]
    InvalidInput { what: String },
    #[error("failed to fork the current process: {0}")]
    Fork(#[source] io::Error),
    #[error("failed to exec the new process: {0}")]
    Exec(#[source] io::Error),
    #[error("failed to launch a new process: {0}")]
    Launch(#[source] io::Error),
    #[error("failed to wait for the child process: {0}")]
    Wait(#[source] io::Error),
}

impl ExecError {
    /// True when the diagnostic was already written to stderr by the child.
    pub fn reported_by_child(&self) -> bool {
        matches!(self, Self::Exec(_))
    }

    /// The underlying OS error, when there is one.
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            Self::Pipe { source, .. } => Some(source),
            Self::Fork(e) | Self::Exec(e) | Self::Launch(e) | Self::Wait(e) => Some(e),
            Self::InvalidInput { .. } => None,
        }
    }
}

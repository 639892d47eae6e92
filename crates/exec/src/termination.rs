use std::fmt;

/// Result reported when the spawn machinery itself fails.
///
/// It is narrowed to 255 when used as a process exit status on Unix.
pub const SPAWN_FAILURE: i32 = -1;

/// How a waited-for child finished. Exactly one shape describes any completed wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with the child's exit code.
    Exited(i32),
    /// Killed by the given signal number.
    Signaled(i32),
    /// Stopped by the given signal number.
    Stopped(i32),
    /// A status the platform reported but that fits none of the above.
    Unparseable(String),
}

impl Termination {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            _ => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            Self::Signaled(signal) | Self::Stopped(signal) => Some(*signal),
            _ => None,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code() == Some(0)
    }

    /// The exit code to report without re-raising anything: the child's own
    /// code, or [`SPAWN_FAILURE`] for every other shape.
    pub fn into_exit_code(self) -> i32 {
        self.exit_code().unwrap_or(SPAWN_FAILURE)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {code}"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
            Self::Stopped(signal) => write!(f, "stopped by signal {signal}"),
            Self::Unparseable(raw) => write!(f, "unrecognized status {raw}"),
        }
    }
}

use tracing::debug;

use crate::error::ExecError;
use crate::invocation::Invocation;
use crate::platform;
use crate::termination::{Termination, SPAWN_FAILURE};

/// Launch the invocation and wait for it, keeping spawn failures distinct from
/// the child's own status.
pub fn spawn_and_wait(invocation: &Invocation) -> Result<Termination, ExecError> {
    debug!(
        executable = %invocation.executable().to_string_lossy(),
        args = invocation.arguments().len(),
        env = invocation.environment().len(),
        "exec"
    );
    platform::spawn_and_wait(invocation)
}

/// Launch the invocation and return the single integer the caller should exit
/// with.
///
/// This is the child's exit code, or [`SPAWN_FAILURE`] after a diagnostic on
/// stderr. On Unix a child killed or stopped by a signal has that signal
/// re-raised in the calling process.
pub fn exec(invocation: &Invocation) -> i32 {
    match spawn_and_wait(invocation) {
        Ok(termination) => propagate(termination),
        Err(err) => {
            if !err.reported_by_child() {
                eprintln!("process wrapper error: {err}.");
            }
            SPAWN_FAILURE
        }
    }
}

/// Turn a termination into an exit code, re-raising signals in this process.
///
/// Returns [`SPAWN_FAILURE`] if a re-raised signal did not end the process.
pub fn propagate(termination: Termination) -> i32 {
    if let Some(signal) = termination.signal() {
        platform::reraise(signal);
    } else if let Termination::Unparseable(raw) = &termination {
        eprintln!("process wrapper error: failed to parse exit code of the child process: {raw}.");
    }
    termination.into_exit_code()
}

//! Unix executor: `fork`, `execve`, `waitpid`.
//!
//! Everything the child needs (the `CString`s and their pointer arrays) is
//! built before forking, so the child branch only makes async-signal-safe
//! calls. A close-on-exec status pipe carries the `execve` errno back to the
//! parent, which lets the parent tell "the program could not be started"
//! apart from "the program ran and exited with 255".

#![allow(unsafe_code)]

use std::ffi::{CString, OsStr};
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::ptr;

use libc::c_char;
use nix::errno::Errno;
use nix::sys::signal::{pthread_sigmask, raise, signal, SigHandler, SigSet, SigmaskHow, Signal};
use nix::sys::stat::{umask, Mode};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use tracing::{debug, trace, warn};

use crate::error::ExecError;
use crate::invocation::Invocation;
use crate::termination::{Termination, SPAWN_FAILURE};

/// Trailer written after the errno on the status pipe.
const STATUS_FOOTER: [u8; 4] = *b"NOEX";

/// Spawn the invocation and block until the child terminates.
pub fn spawn_and_wait(invocation: &Invocation) -> Result<Termination, ExecError> {
    let stdout_pipe = OutputPipe::open("stdout")?;
    let stderr_pipe = OutputPipe::open("stderr")?;
    let argv = CStringArray::new(
        std::iter::once(invocation.executable()).chain(
            invocation
                .arguments()
                .iter()
                .map(|argument| argument.as_os_str()),
        ),
        "argument",
    )?;
    let envp = CStringArray::new(
        invocation.environment().iter().map(|entry| entry.as_os_str()),
        "environment entry",
    )?;
    let (status_read, status_write) = cloexec_pipe().map_err(|source| ExecError::Pipe {
        stream: "status",
        source,
    })?;

    // SAFETY: the child branch only calls async-signal-safe functions
    // (umask, execve, write, _exit) on memory prepared before the fork.
    let child = match unsafe { fork() } {
        Ok(ForkResult::Child) => run_child(&argv, &envp, status_write.as_raw_fd()),
        Ok(ForkResult::Parent { child }) => child,
        Err(errno) => return Err(ExecError::Fork(errno.into())),
    };
    drop(status_write);
    debug!(pid = child.as_raw(), "spawned child process");

    let exec_error = read_exec_error(status_read);
    let status = wait_for(child)?;
    drop(stdout_pipe);
    drop(stderr_pipe);

    if let Some(errno) = exec_error {
        debug!(pid = child.as_raw(), ?status, "child failed to exec");
        return Err(ExecError::Exec(io::Error::from_raw_os_error(errno)));
    }

    let termination = classify(status);
    debug!(
        pid = child.as_raw(),
        %termination,
        success = termination.success(),
        "child process finished"
    );
    Ok(termination)
}

/// Deliver `signal` to the calling process with its default disposition.
///
/// The runtime ignores SIGPIPE and handles SIGSEGV/SIGBUS itself, so the
/// disposition is reset and the signal unblocked before raising. Returns only
/// if the signal does not terminate the process (stop signals, or a reset
/// that failed).
pub(crate) fn reraise(signal_number: i32) {
    let sig = match Signal::try_from(signal_number) {
        Ok(sig) => sig,
        Err(errno) => {
            warn!(signal = signal_number, %errno, "child reported an unknown signal");
            return;
        }
    };
    debug!(signal = ?sig, "re-raising child signal");

    // SAFETY: SIG_DFL runs no handler code in this process.
    if let Err(errno) = unsafe { signal(sig, SigHandler::SigDfl) } {
        // SIGKILL and SIGSTOP cannot be changed.
        trace!(signal = ?sig, %errno, "default disposition not restored");
    }
    let mut pending = SigSet::empty();
    pending.add(sig);
    if let Err(errno) = pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(&pending), None) {
        trace!(signal = ?sig, %errno, "signal not unblocked");
    }
    if let Err(errno) = raise(sig) {
        warn!(signal = ?sig, %errno, "failed to re-raise signal");
    }
}

fn classify(status: WaitStatus) -> Termination {
    match status {
        WaitStatus::Exited(_, code) => Termination::Exited(code),
        WaitStatus::Signaled(_, sig, _) => Termination::Signaled(sig as i32),
        WaitStatus::Stopped(_, sig) => Termination::Stopped(sig as i32),
        other => Termination::Unparseable(format!("{other:?}")),
    }
}

fn wait_for(child: Pid) -> Result<WaitStatus, ExecError> {
    loop {
        match waitpid(child, None) {
            Ok(status) => return Ok(status),
            Err(Errno::EINTR) => trace!(pid = child.as_raw(), "waitpid interrupted, retrying"),
            Err(errno) => return Err(ExecError::Wait(errno.into())),
        }
    }
}

/// Read the status pipe until the child either execs (EOF) or reports why it
/// could not.
fn read_exec_error(status_read: OwnedFd) -> Option<i32> {
    let mut message = Vec::with_capacity(8);
    if let Err(err) = File::from(status_read).read_to_end(&mut message) {
        warn!(%err, "failed to read the exec status pipe");
        return None;
    }
    match message.as_slice() {
        [] => None,
        [a, b, c, d, footer @ ..] if footer == STATUS_FOOTER => {
            Some(i32::from_be_bytes([*a, *b, *c, *d]))
        }
        other => {
            warn!(len = other.len(), "malformed message on the exec status pipe");
            None
        }
    }
}

/// Child side of the fork. Never returns into the caller.
fn run_child(argv: &CStringArray, envp: &CStringArray, status_fd: RawFd) -> ! {
    // umask 022
    umask(Mode::S_IWGRP | Mode::S_IWOTH);
    reset_signal_state();

    // SAFETY: both arrays are NUL-terminated and outlive the call.
    unsafe { libc::execve(argv.program(), argv.as_ptr(), envp.as_ptr()) };
    let errno = Errno::last();

    write_all(libc::STDERR_FILENO, b"process wrapper error: failed to exec the new process: ");
    write_all(libc::STDERR_FILENO, errno.desc().as_bytes());
    write_all(libc::STDERR_FILENO, b".\n");

    let code = (errno as i32).to_be_bytes();
    let mut message = [0u8; 8];
    message[..4].copy_from_slice(&code);
    message[4..].copy_from_slice(&STATUS_FOOTER);
    write_all(status_fd, &message);

    // SAFETY: `_exit` skips atexit handlers and destructors inherited from the parent.
    unsafe { libc::_exit(SPAWN_FAILURE) }
}

/// Async-signal-safe write loop.
fn write_all(fd: RawFd, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: `bytes` is a valid, initialized buffer.
        let written = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if written < 0 {
            if Errno::last() == Errno::EINTR {
                continue;
            }
            return;
        }
        bytes = &bytes[written as usize..];
    }
}

/// Give the program a clean signal state: empty mask, SIGPIPE at its default.
///
/// Ignored dispositions and the mask survive `execve`, and the runtime ignores
/// SIGPIPE. Only async-signal-safe calls on stack memory.
fn reset_signal_state() {
    let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None);
    // SAFETY: SIG_DFL installs no handler code.
    let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
))]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::OFlag;
    use nix::unistd::pipe2;

    Ok(pipe2(OFlag::O_CLOEXEC)?)
}

/// Fallback where `pipe2` is missing. Another thread may fork between the two
/// calls.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};
    use nix::unistd::pipe;

    let (read_end, write_end) = pipe()?;
    for fd in [&read_end, &write_end] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read_end, write_end))
}

/// A stdout or stderr pipe pair. Both ends close when this is dropped.
struct OutputPipe {
    read_end: OwnedFd,
    write_end: OwnedFd,
}

impl OutputPipe {
    fn open(stream: &'static str) -> Result<Self, ExecError> {
        let (read_end, write_end) =
            cloexec_pipe().map_err(|source| ExecError::Pipe { stream, source })?;
        let pipe = Self { read_end, write_end };
        trace!(
            stream,
            read_fd = pipe.read_end.as_raw_fd(),
            write_fd = pipe.write_end.as_raw_fd(),
            "opened output pipe"
        );
        Ok(pipe)
    }
}

/// Owned `CString`s plus the NULL-terminated pointer array `execve` expects.
struct CStringArray {
    _strings: Vec<CString>,
    pointers: Vec<*const c_char>,
}

impl CStringArray {
    fn new<'a>(
        values: impl Iterator<Item = &'a OsStr>,
        what: &'static str,
    ) -> Result<Self, ExecError> {
        let strings = values
            .enumerate()
            .map(|(index, value)| {
                CString::new(value.as_bytes()).map_err(|_| ExecError::InvalidInput {
                    what: format!("{what} {index} ({})", value.to_string_lossy()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let pointers = strings
            .iter()
            .map(|value| value.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();
        Ok(Self {
            _strings: strings,
            pointers,
        })
    }

    fn as_ptr(&self) -> *const *const c_char {
        self.pointers.as_ptr()
    }

    /// The first entry, the program path for `argv`.
    fn program(&self) -> *const c_char {
        self.pointers[0]
    }
}

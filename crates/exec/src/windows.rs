//! Windows executor: `CreateProcessW`, `WaitForSingleObject`, `GetExitCodeProcess`.
//!
//! There is no signal to propagate on Windows; the child's 32-bit exit code is
//! surfaced as-is (reinterpreted as `i32`), so every terminated child maps to
//! [`Termination::Exited`].

#![allow(unsafe_code)]

use std::io;
use std::mem;
use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle, RawHandle};
use std::ptr;

use tracing::{debug, trace};
use windows_sys::Win32::Foundation::{SetHandleInformation, HANDLE, HANDLE_FLAG_INHERIT, TRUE};
use windows_sys::Win32::Security::SECURITY_ATTRIBUTES;
use windows_sys::Win32::System::Pipes::CreatePipe;
use windows_sys::Win32::System::Threading::{
    CreateProcessW, GetExitCodeProcess, WaitForSingleObject, CREATE_UNICODE_ENVIRONMENT, INFINITE,
    PROCESS_INFORMATION, STARTUPINFOW,
};

use crate::assembler;
use crate::error::ExecError;
use crate::invocation::Invocation;
use crate::termination::{Termination, SPAWN_FAILURE};

/// Spawn the invocation and block until the child terminates.
pub fn spawn_and_wait(invocation: &Invocation) -> Result<Termination, ExecError> {
    let mut command_line =
        assembler::command_line(invocation.executable(), invocation.arguments());
    command_line.push(0);
    let environment = assembler::environment_block(invocation.environment());

    let _stdout_pipe = OutputPipe::open("stdout")?;
    let _stderr_pipe = OutputPipe::open("stderr")?;

    let mut startup_info: STARTUPINFOW = unsafe { mem::zeroed() };
    startup_info.cb = mem::size_of::<STARTUPINFOW>() as u32;
    let mut process_info: PROCESS_INFORMATION = unsafe { mem::zeroed() };

    trace!(
        command_line = %String::from_utf16_lossy(&command_line[..command_line.len() - 1]),
        "creating process"
    );

    // SAFETY: `command_line` is a mutable NUL-terminated buffer and
    // `environment` a double-NUL-terminated UTF-16 block; both outlive the call.
    let created = unsafe {
        CreateProcessW(
            ptr::null(),
            command_line.as_mut_ptr(),
            ptr::null(),
            ptr::null(),
            TRUE,
            CREATE_UNICODE_ENVIRONMENT,
            environment.as_ptr().cast(),
            ptr::null(),
            &startup_info,
            &mut process_info,
        )
    };
    if created == 0 {
        return Err(ExecError::Launch(io::Error::last_os_error()));
    }

    // SAFETY: CreateProcessW succeeded, so both handles are valid and owned by us.
    let process = unsafe { owned(process_info.hProcess) };
    let _thread = unsafe { owned(process_info.hThread) };
    debug!(pid = process_info.dwProcessId, "spawned child process");

    let wait = unsafe { WaitForSingleObject(raw(&process), INFINITE) };
    trace!(wait, "child process signalled");

    let mut exit_code: u32 = 0;
    let code = if unsafe { GetExitCodeProcess(raw(&process), &mut exit_code) } == 0 {
        debug!(err = %io::Error::last_os_error(), "failed to query the exit code");
        SPAWN_FAILURE
    } else {
        exit_code as i32
    };

    let termination = Termination::Exited(code);
    debug!(
        pid = process_info.dwProcessId,
        %termination,
        success = termination.success(),
        "child process finished"
    );
    Ok(termination)
}

/// Windows has no signals to re-raise; callers fall back to the sentinel.
pub(crate) fn reraise(signal: i32) {
    debug!(signal, "signal re-raise is not supported on Windows");
}

unsafe fn owned(handle: HANDLE) -> OwnedHandle {
    OwnedHandle::from_raw_handle(handle as RawHandle)
}

fn raw(handle: &OwnedHandle) -> HANDLE {
    handle.as_raw_handle() as HANDLE
}

/// A stdout or stderr pipe pair. The read end is not inheritable, the write
/// end is. Both handles close when this is dropped.
struct OutputPipe {
    read_end: OwnedHandle,
    write_end: OwnedHandle,
}

impl OutputPipe {
    fn open(stream: &'static str) -> Result<Self, ExecError> {
        let attributes = SECURITY_ATTRIBUTES {
            nLength: mem::size_of::<SECURITY_ATTRIBUTES>() as u32,
            lpSecurityDescriptor: ptr::null_mut(),
            bInheritHandle: TRUE,
        };
        let mut read_end: HANDLE = 0;
        let mut write_end: HANDLE = 0;

        // SAFETY: out-pointers are valid for writes.
        if unsafe { CreatePipe(&mut read_end, &mut write_end, &attributes, 0) } == 0 {
            return Err(pipe_error(stream));
        }
        // SAFETY: CreatePipe succeeded, so both handles are valid and ours.
        let pipe = unsafe {
            Self {
                read_end: owned(read_end),
                write_end: owned(write_end),
            }
        };

        if unsafe { SetHandleInformation(raw(&pipe.read_end), HANDLE_FLAG_INHERIT, 0) } == 0 {
            return Err(pipe_error(stream));
        }
        trace!(stream, write = ?pipe.write_end, "opened output pipe");
        Ok(pipe)
    }
}

fn pipe_error(stream: &'static str) -> ExecError {
    ExecError::Pipe {
        stream,
        source: io::Error::last_os_error(),
    }
}

//! Child process execution for the process wrapper
//!
//! This crate launches one child process with an explicit argument vector and
//! environment block, blocks until it terminates, and turns the outcome into a
//! single exit code for the caller.
//!
//! ## Architecture
//!
//! - [`assembler`] builds the Windows command line and environment block. It is
//!   compiled everywhere so the quoting rules can be tested on any host.
//! - [`platform`] is the executor for the current target: `fork`/`execve`/`waitpid`
//!   on Unix, `CreateProcessW` on Windows. Exactly one is compiled.
//! - [`exec`] glues the two together and propagates signals on Unix.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use process_wrapper_exec::{exec, Invocation};
//!
//! let invocation = Invocation::new("/usr/bin/rustc")
//!     .arg("--version")
//!     .inherit_env();
//! std::process::exit(exec(&invocation));
//! ```

pub mod assembler;
mod error;
mod exec;
mod invocation;
mod termination;

#[cfg(unix)]
pub mod posix;
#[cfg(windows)]
pub mod windows;

/// Executor for the current target platform.
#[cfg(unix)]
pub use crate::posix as platform;
#[cfg(windows)]
pub use crate::windows as platform;

pub use error::ExecError;
pub use exec::{exec, propagate, spawn_and_wait};
pub use invocation::{current_environment, environment_entry, Invocation};
pub use termination::{Termination, SPAWN_FAILURE};

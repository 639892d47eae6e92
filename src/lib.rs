//! Deterministic process wrapper
//!
//! Runs a build tool (typically rustc) with the caller's arguments and
//! environment, appending `--remap-path-prefix=<cwd>=` so the absolute build
//! directory never leaks into the tool's output. The tool's exit code, or the
//! signal that killed it, becomes the wrapper's own.
//!
//! ## Usage
//!
//! ```text
//! process_wrapper <executable> [args...]
//! ```
//!
//! ```rust,no_run
//! use process_wrapper::run_wrapper;
//!
//! fn main() -> anyhow::Result<()> {
//!     let exit_code = run_wrapper()?;
//!     std::process::exit(exit_code);
//! }
//! ```

pub use context::{remap_path_prefix_flag, WrapperContext, REMAP_PATH_PREFIX_FLAG};
pub use run::{run_wrapper, run_with_context, VERSION};

pub mod config;
mod context;
mod logging;
mod run;

pub use process_wrapper_exec::{Termination, SPAWN_FAILURE};

//! Entry point: build the context, append the remap flag, exec the child.

use anyhow::{Context, Result};
use std::time::Instant;
use tracing::debug;

use crate::config::WrapperSettings;
use crate::context::WrapperContext;
use crate::logging;

/// Version string baked in by build.rs
pub const VERSION: &str = env!("PROCESS_WRAPPER_VERSION");

/// Main wrapper function
pub fn run_wrapper() -> Result<i32> {
    let settings = WrapperSettings::from_env();
    logging::init(&settings);
    debug!(version = VERSION, ?settings, "process wrapper starting");

    let ctx = WrapperContext::from_current_process()
        .context("failed to collect the wrapper invocation")?;
    Ok(run_with_context(&ctx))
}

/// Run a prepared context and return the wrapper's exit code.
///
/// On Unix this does not return if the child died by a signal.
pub fn run_with_context(ctx: &WrapperContext) -> i32 {
    let invocation = ctx.invocation();
    debug!(
        executable = %ctx.executable.to_string_lossy(),
        forwarded = ctx.forwarded_args.len(),
        remap = %ctx.remap_flag().to_string_lossy(),
        "launching child"
    );

    let start_time = Instant::now();
    let exit_code = process_wrapper_exec::exec(&invocation);
    debug!(
        exit_code,
        duration_ms = start_time.elapsed().as_millis() as u64,
        "child finished"
    );
    exit_code
}

//! process_wrapper: run a build tool with its working directory remapped
//!
//! `process_wrapper <executable> [args...]` forwards the arguments and the
//! full environment, appends `--remap-path-prefix=<cwd>=`, and exits with the
//! child's status.

use process_wrapper::{run_wrapper, SPAWN_FAILURE};

fn main() {
    let exit_code = match run_wrapper() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("process wrapper error: {e:#}");
            SPAWN_FAILURE
        }
    };
    std::process::exit(exit_code);
}

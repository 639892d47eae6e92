//! Invocation context for one wrapper run
//!
//! Collects the target executable, the forwarded arguments, the environment
//! and the working directory, and appends the deterministic-build flag.

use anyhow::{anyhow, Result};
use std::env;
use std::ffi::{OsStr, OsString};

use process_wrapper_exec::{current_environment, Invocation};

/// Flag that makes rustc rewrite a path prefix in everything it emits.
pub const REMAP_PATH_PREFIX_FLAG: &str = "--remap-path-prefix=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperContext {
    /// `argv[1]`: the program to run
    pub executable: OsString,
    /// `argv[2..]`, forwarded verbatim
    pub forwarded_args: Vec<OsString>,
    /// `NAME=VALUE` entries passed through unmodified
    pub environment: Vec<OsString>,
    /// Empty when the working directory could not be determined
    pub working_dir: OsString,
}

impl WrapperContext {
    /// Create context from this process's arguments, environment and cwd.
    pub fn from_current_process() -> Result<Self> {
        Self::from_parts(
            env::args_os(),
            current_environment(),
            current_working_directory(),
        )
    }

    /// `argv` includes the wrapper's own name at position 0.
    pub fn from_parts<I>(argv: I, environment: Vec<OsString>, working_dir: OsString) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv
            .next()
            .unwrap_or_else(|| OsString::from("process_wrapper"));
        let executable = argv.next().ok_or_else(|| {
            anyhow!(
                "usage: {} <executable> [args...]",
                program.to_string_lossy()
            )
        })?;

        Ok(Self {
            executable,
            forwarded_args: argv.collect(),
            environment,
            working_dir,
        })
    }

    /// `--remap-path-prefix=<cwd>=`
    pub fn remap_flag(&self) -> OsString {
        remap_path_prefix_flag(&self.working_dir)
    }

    /// Forwarded arguments followed by the remap flag.
    pub fn child_arguments(&self) -> Vec<OsString> {
        let mut arguments = self.forwarded_args.clone();
        arguments.push(self.remap_flag());
        arguments
    }

    pub fn invocation(&self) -> Invocation {
        Invocation::from_parts(
            self.executable.clone(),
            self.child_arguments(),
            self.environment.clone(),
        )
    }
}

/// Build the flag that maps `working_dir` to the empty string.
pub fn remap_path_prefix_flag(working_dir: &OsStr) -> OsString {
    let mut flag = OsString::from(REMAP_PATH_PREFIX_FLAG);
    flag.push(working_dir);
    flag.push("=");
    flag
}

/// The absolute working directory, or an empty string if it is unavailable.
pub fn current_working_directory() -> OsString {
    env::current_dir()
        .map(|dir| dir.into_os_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[test]
    fn remap_flag_is_appended_after_forwarded_args() {
        let ctx = WrapperContext::from_parts(
            ["process_wrapper", "/usr/bin/rustc", "-c", "foo.c"],
            os(&["PATH=/bin"]),
            OsString::from("/home/build/proj"),
        )
        .unwrap();

        assert_eq!(ctx.executable, "/usr/bin/rustc");
        assert_eq!(
            ctx.child_arguments(),
            os(&["-c", "foo.c", "--remap-path-prefix=/home/build/proj="])
        );

        let invocation = ctx.invocation();
        assert_eq!(invocation.executable(), "/usr/bin/rustc");
        assert_eq!(invocation.arguments(), ctx.child_arguments().as_slice());
        assert_eq!(invocation.environment(), ["PATH=/bin"]);
    }

    #[test]
    fn unknown_working_directory_maps_empty_prefix() {
        assert_eq!(remap_path_prefix_flag(OsStr::new("")), "--remap-path-prefix==");
    }

    #[test]
    fn empty_and_hyphenated_arguments_are_forwarded() {
        let ctx = WrapperContext::from_parts(
            ["pw", "tool", "", "--help", "-"],
            Vec::new(),
            OsString::from("/w"),
        )
        .unwrap();
        assert_eq!(ctx.forwarded_args, os(&["", "--help", "-"]));
    }

    #[test]
    fn missing_executable_is_a_usage_error() {
        let err = WrapperContext::from_parts(["pw"], Vec::new(), OsString::new()).unwrap_err();
        assert!(err.to_string().contains("usage: pw <executable>"));

        let err =
            WrapperContext::from_parts(Vec::<OsString>::new(), Vec::new(), OsString::new())
                .unwrap_err();
        assert!(err.to_string().contains("usage: process_wrapper"));
    }

    #[test]
    fn current_process_context_uses_cwd() {
        let cwd = env::current_dir().unwrap();
        assert_eq!(current_working_directory(), cwd.into_os_string());
    }
}

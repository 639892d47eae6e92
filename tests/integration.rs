#![cfg(unix)]
//! Integration tests for the process_wrapper binary
//!
//! These drive the built binary end to end: argument forwarding, the remap
//! flag, environment passthrough, exit codes and signal propagation.

use anyhow::Result;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use nix::sys::signal::Signal;
use tempfile::TempDir;

fn wrapper() -> Command {
    Command::new(env!("CARGO_BIN_EXE_process_wrapper"))
}

fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    let mut perms = fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms)?;
    Ok(path)
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn remap_flag_follows_forwarded_arguments() -> Result<()> {
    let temp = TempDir::new()?;
    let script = write_script(temp.path(), "args.sh", r#"printf '%s\n' "$@""#)?;
    let workdir = fs::canonicalize(temp.path())?;

    let output = wrapper()
        .arg(&script)
        .args(["-c", "foo.c"])
        .current_dir(&workdir)
        .output()?;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_lines(&output),
        vec![
            "-c".to_string(),
            "foo.c".to_string(),
            format!("--remap-path-prefix={}=", workdir.display()),
        ]
    );
    Ok(())
}

#[test]
fn empty_and_hyphenated_arguments_survive() -> Result<()> {
    let temp = TempDir::new()?;
    let script = write_script(temp.path(), "count.sh", r#"printf '%s:%s:%s' "$#" "$1" "$2""#)?;

    let output = wrapper().arg(&script).args(["", "--help"]).output()?;

    assert!(output.status.success());
    // "", "--help" and the remap flag
    assert_eq!(String::from_utf8_lossy(&output.stdout), "3::--help");
    Ok(())
}

#[test]
fn environment_is_forwarded() -> Result<()> {
    let temp = TempDir::new()?;
    let script = write_script(temp.path(), "env.sh", r#"printf '%s' "$PW_TEST_VALUE""#)?;

    let output = wrapper()
        .arg(&script)
        .env_clear()
        .env("PW_TEST_VALUE", "forwarded value")
        .output()?;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "forwarded value");
    Ok(())
}

#[test]
fn exit_code_is_propagated() -> Result<()> {
    let status = wrapper().args(["/bin/sh", "-c", "exit 7"]).status()?;
    assert_eq!(status.code(), Some(7));

    let status = wrapper().args(["/bin/sh", "-c", "exit 0"]).status()?;
    assert!(status.success());
    Ok(())
}

#[test]
fn signal_death_is_propagated() -> Result<()> {
    // SIGPIPE is ignored and SIGSEGV handled by the Rust runtime in the wrapper.
    let temp = TempDir::new()?;
    for signal in [Signal::SIGTERM, Signal::SIGPIPE, Signal::SIGSEGV] {
        let script = format!("ulimit -c 0; kill -{} $$", &signal.as_str()[3..]);
        let status = wrapper()
            .args(["/bin/sh", "-c", script.as_str()])
            .current_dir(temp.path())
            .status()?;

        assert_eq!(status.code(), None, "{signal:?}: {status:?}");
        assert_eq!(status.signal(), Some(signal as i32), "{signal:?}: {status:?}");
    }
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn child_starts_with_default_signal_state() -> Result<()> {
    let output = wrapper()
        .args([
            "/bin/sh",
            "-c",
            "exec grep -E '^Sig(Blk|Ign):' /proc/self/status",
        ])
        .env("PATH", "/usr/bin:/bin")
        .output()?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2, "{lines:?}");
    for line in lines {
        let (name, mask) = line.split_once(':').unwrap_or_default();
        let mask = u64::from_str_radix(mask.trim(), 16)?;
        match name {
            "SigBlk" => assert_eq!(mask, 0),
            "SigIgn" => assert_eq!(mask & (1 << (Signal::SIGPIPE as i32 - 1)), 0),
            other => panic!("unexpected line {other}"),
        }
    }
    Ok(())
}

#[test]
fn missing_executable_reports_and_fails() -> Result<()> {
    let output = wrapper().arg("/nonexistent/process-wrapper-tool").output()?;

    // The -1 sentinel narrowed to an 8-bit exit status.
    assert_eq!(output.status.code(), Some(255));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("process wrapper error: failed to exec the new process"),
        "unexpected stderr: {stderr}"
    );
    assert_eq!(stderr.matches("process wrapper error").count(), 1);
    Ok(())
}

#[test]
fn no_arguments_prints_usage() -> Result<()> {
    let output = wrapper().output()?;

    assert_eq!(output.status.code(), Some(255));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage:"));
    Ok(())
}

#[test]
fn debug_logging_goes_to_stderr_only() -> Result<()> {
    let temp = TempDir::new()?;
    let script = write_script(temp.path(), "hello.sh", "printf hello")?;

    let output = wrapper()
        .arg(&script)
        .env("PROCESS_WRAPPER_LOG", "debug")
        .env("PROCESS_WRAPPER_LOG_FORMAT", "json")
        .output()?;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("launching child"), "stderr: {stderr}");
    assert!(stderr.lines().all(|line| line.starts_with('{')));
    Ok(())
}

#[test]
fn default_run_is_silent_on_stderr() -> Result<()> {
    let output = wrapper()
        .args(["/bin/sh", "-c", "exit 0"])
        .env_remove("PROCESS_WRAPPER_LOG")
        .output()?;

    assert!(output.status.success());
    assert!(output.stderr.is_empty());
    Ok(())
}

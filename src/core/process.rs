//! Process execution utilities with timeout support
//!
//! Provides helpers for running external processes (yt-dlp, ffmpeg) with
//! bounded waits. Every command is spawned with `kill_on_drop`, so dropping
//! the future (timeout or client disconnect) kills the child.

use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Number of stderr lines kept when reporting a failed process
pub const STDERR_TAIL_LINES: usize = 200;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {}s", .timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },
}

/// Name of the program a command runs, for log lines and errors.
pub fn program_name(cmd: &Command) -> String {
    cmd.as_std().get_program().to_string_lossy().into_owned()
}

/// Run an async Command with a timeout.
///
/// Returns the process Output (whatever the exit status), or a
/// [`ProcessError`] on spawn failure or timeout. On timeout the child is
/// killed.
pub async fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, ProcessError> {
    let program = program_name(cmd);
    cmd.stdin(Stdio::null()).kill_on_drop(true);

    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(ProcessError::Spawn { program, source }),
        Err(_) => {
            log::error!("{} timed out after {}s, killed", program, timeout.as_secs());
            Err(ProcessError::TimedOut { program, timeout })
        }
    }
}

/// Keeps the last `max_lines` lines of a process' stderr.
pub fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

/// Human-readable exit description ("exit code 1", "killed by signal").
pub fn describe_exit(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "killed by signal".to_string(),
    }
}

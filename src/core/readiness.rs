//! Startup-phase gating
//!
//! Downloads are refused until a one-time setup task has verified the
//! external tools. The phase is an explicit [`Readiness`] value published
//! through a `watch` channel, so handlers always see the latest state.

use std::time::Duration;
use tokio::process::Command;
use tokio::sync::watch;

use crate::core::config::ToolSettings;
use crate::core::error::AppError;
use crate::core::process::{describe_exit, run_with_timeout, stderr_tail};

/// Timeout for `--version` probes
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for `yt-dlp -U`
const UPDATE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Initializing,
    Ready,
    Failed(String),
}

impl Readiness {
    pub fn label(&self) -> &'static str {
        match self {
            Readiness::Initializing => "initializing",
            Readiness::Ready => "ready",
            Readiness::Failed(_) => "failed",
        }
    }

    /// Ok when downloads may proceed, `ServiceInitializing` otherwise.
    pub fn ensure_ready(&self) -> Result<(), AppError> {
        match self {
            Readiness::Ready => Ok(()),
            Readiness::Initializing => Err(AppError::ServiceInitializing(
                "Service is initializing, please retry shortly".to_string(),
            )),
            Readiness::Failed(reason) => Err(AppError::ServiceInitializing(format!(
                "Service dependencies are unavailable: {}",
                reason
            ))),
        }
    }
}

/// Read side of the readiness channel, cheap to clone into server state.
#[derive(Debug, Clone)]
pub struct ReadinessHandle {
    rx: watch::Receiver<Readiness>,
}

impl ReadinessHandle {
    /// Creates an `Initializing` channel. The sender drives setup.
    pub fn channel() -> (watch::Sender<Readiness>, Self) {
        let (tx, rx) = watch::channel(Readiness::Initializing);
        (tx, Self { rx })
    }

    /// A handle that is already `Ready` (no setup phase).
    pub fn ready() -> Self {
        let (_tx, rx) = watch::channel(Readiness::Ready);
        Self { rx }
    }

    pub fn current(&self) -> Readiness {
        self.rx.borrow().clone()
    }
}

/// Runs `<bin> <flag>` and returns the first line of its output.
pub async fn probe_version(bin: &str, flag: &str) -> Result<String, String> {
    let mut cmd = Command::new(bin);
    cmd.arg(flag);

    let output = run_with_timeout(&mut cmd, VERSION_PROBE_TIMEOUT)
        .await
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        return Err(format!(
            "{} {} failed ({}): {}",
            bin,
            flag,
            describe_exit(&output.status),
            stderr_tail(&output.stderr, 5)
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}

/// Tries `yt-dlp -U`. Failure is logged, never fatal.
async fn update_ytdlp(bin: &str) {
    log::info!("Checking for yt-dlp updates...");
    let mut cmd = Command::new(bin);
    cmd.arg("-U");

    match run_with_timeout(&mut cmd, UPDATE_TIMEOUT).await {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if stdout.contains("up to date") || stdout.contains("up-to-date") {
                log::info!("yt-dlp is already up to date");
            } else {
                log::info!("yt-dlp update check completed: {}", stdout.trim());
            }
        }
        Ok(output) => {
            // Exit code 100 means yt-dlp was installed through pip and cannot self-update
            log::warn!(
                "yt-dlp update check failed ({}): {}",
                describe_exit(&output.status),
                stderr_tail(&output.stderr, 5)
            );
        }
        Err(e) => log::warn!("yt-dlp update check failed: {}. Continuing anyway.", e),
    }
}

/// Verifies yt-dlp and ffmpeg, optionally updating yt-dlp first.
pub async fn run_setup(tools: &ToolSettings, auto_update: bool) -> Readiness {
    if auto_update {
        update_ytdlp(&tools.ytdlp_bin).await;
    }

    let mut problems = Vec::new();

    match probe_version(&tools.ytdlp_bin, "--version").await {
        Ok(version) => log::info!("yt-dlp version: {}", version),
        Err(e) => problems.push(e),
    }
    match probe_version(&tools.ffmpeg_bin, "-version").await {
        Ok(version) => log::info!("ffmpeg: {}", version),
        Err(e) => problems.push(e),
    }

    if problems.is_empty() {
        Readiness::Ready
    } else {
        let reason = problems.join("; ");
        log::error!("Startup setup failed: {}", reason);
        Readiness::Failed(reason)
    }
}

/// Spawns the setup task and publishes its result on `tx`.
pub fn spawn_setup(tx: watch::Sender<Readiness>, tools: ToolSettings, auto_update: bool) {
    tokio::spawn(async move {
        let state = run_setup(&tools, auto_update).await;
        log::info!("Readiness: {}", state.label());
        // No receivers left means the server shut down, nothing to publish
        let _ = tx.send(state);
    });
}

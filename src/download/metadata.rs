//! Title lookup through yt-dlp.

use tokio::process::Command;

use crate::core::config::ToolSettings;
use crate::core::error::AppError;
use crate::core::process::{describe_exit, run_with_timeout, stderr_tail, STDERR_TAIL_LINES};
use crate::core::utils::{resolve_title_forms, ResolvedTitle};
use crate::core::validation::VideoId;

/// yt-dlp arguments asking for the title field only.
pub fn title_args(video_id: &VideoId) -> Vec<String> {
    vec![
        "--print".to_string(),
        "%(title)s".to_string(),
        "--no-playlist".to_string(),
        "--skip-download".to_string(),
        "--no-warnings".to_string(),
        video_id.watch_url(),
    ]
}

/// Resolves and sanitizes the title of `video_id`.
///
/// Any failure (spawn, timeout, non-zero exit, empty output) is
/// `UpstreamUnavailable`: without a title there is no response filename.
pub async fn resolve_title(tools: &ToolSettings, video_id: &VideoId) -> Result<ResolvedTitle, AppError> {
    let mut cmd = Command::new(&tools.ytdlp_bin);
    cmd.args(title_args(video_id));
    log::debug!("yt-dlp command for title: {} {}", tools.ytdlp_bin, title_args(video_id).join(" "));

    let output = run_with_timeout(&mut cmd, tools.title_timeout).await.map_err(|e| {
        log::error!("Title lookup for {} failed: {}", video_id, e);
        AppError::UpstreamUnavailable("Failed to fetch video title".to_string())
    })?;

    if !output.status.success() {
        log::error!(
            "yt-dlp title lookup for {} failed ({}): {}",
            video_id,
            describe_exit(&output.status),
            stderr_tail(&output.stderr, STDERR_TAIL_LINES)
        );
        return Err(AppError::UpstreamUnavailable("Failed to fetch video title".to_string()));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let raw = raw.lines().next().unwrap_or_default().trim();
    if raw.is_empty() {
        log::error!("yt-dlp returned an empty title for {}", video_id);
        return Err(AppError::UpstreamUnavailable(
            "Failed to fetch video title. Video might be unavailable or private.".to_string(),
        ));
    }

    let title = resolve_title_forms(raw);
    log::info!("Resolved title for {}: '{}'", video_id, title.display);
    Ok(title)
}

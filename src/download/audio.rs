//! Audio acquisition: yt-dlp downloads the best matching audio stream into
//! the request's workspace.

use std::ffi::OsString;
use tokio::process::Command;

use crate::core::config::ToolSettings;
use crate::core::error::AppError;
use crate::core::process::{describe_exit, run_with_timeout, stderr_tail, ProcessError, STDERR_TAIL_LINES};
use crate::download::request::DownloadRequest;
use crate::download::temp::{ArtifactRole, PurgeGuard, TempArtifact, TempWorkspace};
use crate::download::ytdlp_errors::download_error;

/// yt-dlp arguments for downloading the raw audio stream.
pub fn audio_args(workspace: &TempWorkspace, request: &DownloadRequest) -> Vec<OsString> {
    vec![
        "-f".into(),
        request.quality().format_selector().into(),
        "--no-playlist".into(),
        "--no-warnings".into(),
        "--no-progress".into(),
        "-o".into(),
        workspace.output_template(ArtifactRole::Raw).into_os_string(),
        request.video_id().watch_url().into(),
    ]
}

/// Downloads the raw audio for `request` and hands back the produced file.
///
/// On failure, and when the future is dropped mid-download, every file
/// carrying the request token is removed.
pub async fn acquire_audio(
    tools: &ToolSettings,
    workspace: &TempWorkspace,
    request: &DownloadRequest,
) -> Result<TempArtifact, AppError> {
    let mut guard = PurgeGuard::new(workspace);
    let result = run_audio_download(tools, workspace, request).await;
    if result.is_ok() {
        guard.disarm();
    }
    result
}

async fn run_audio_download(
    tools: &ToolSettings,
    workspace: &TempWorkspace,
    request: &DownloadRequest,
) -> Result<TempArtifact, AppError> {
    let mut cmd = Command::new(&tools.ytdlp_bin);
    cmd.args(audio_args(workspace, request));
    log::info!(
        "[{}] yt-dlp audio download, format: {}",
        workspace.token(),
        request.quality().format_selector()
    );

    let output = run_with_timeout(&mut cmd, tools.ytdlp_timeout).await.map_err(|e| match e {
        ProcessError::Spawn { .. } => AppError::DownloadFailed(format!("Failed to start downloader: {}", e)),
        ProcessError::TimedOut { .. } => AppError::DownloadFailed(format!("Download {}", e)),
    })?;

    let stderr = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
    if !output.status.success() {
        log::error!("[{}] yt-dlp {}", workspace.token(), describe_exit(&output.status));
        return Err(download_error(&stderr));
    }

    match workspace.find_produced(ArtifactRole::Raw).await? {
        Some(path) => {
            let artifact = TempArtifact::adopt(path);
            log::info!(
                "[{}] Audio downloaded: {} ({} bytes)",
                workspace.token(),
                artifact.path().display(),
                artifact.size().await.unwrap_or(0)
            );
            Ok(artifact)
        }
        None => {
            log::error!("[{}] yt-dlp succeeded but produced no file. stderr: {}", workspace.token(), stderr);
            Err(AppError::DownloadFailed("Downloader produced no audio file".to_string()))
        }
    }
}

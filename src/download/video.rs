//! Video acquisition straight into a pipe.
//!
//! yt-dlp writes the selected single-file format to stdout (`-o -`). The
//! response is only committed once the first chunk has arrived, so
//! selector and availability failures still reach the client as JSON.
//! After that the pipe is relayed as-is; the child is killed when the
//! [`VideoStream`] is dropped.

use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};

use crate::core::config::ToolSettings;
use crate::core::error::AppError;
use crate::core::process::{describe_exit, STDERR_TAIL_LINES};
use crate::download::request::DownloadRequest;
use crate::download::ytdlp_errors::download_error;

/// Read size for pipe chunks
const CHUNK_SIZE: usize = 64 * 1024;

/// How long to wait for yt-dlp to exit once its stdout is closed
const EXIT_GRACE: Duration = Duration::from_secs(10);

/// yt-dlp arguments streaming the selected format to stdout.
pub fn video_args(request: &DownloadRequest) -> Vec<OsString> {
    vec![
        "-f".into(),
        request.quality().format_selector().into(),
        "--no-playlist".into(),
        "--no-warnings".into(),
        "--no-progress".into(),
        "-o".into(),
        "-".into(),
        request.video_id().watch_url().into(),
    ]
}

/// Drains stderr so yt-dlp never blocks on a full pipe, keeping the tail.
fn drain_stderr(stderr: ChildStderr, token: String) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail = VecDeque::<String>::new();
        while let Ok(Some(line)) = lines.next_line().await {
            log::debug!("[{}] yt-dlp stderr: {}", token, line);
            tail.push_back(line);
            if tail.len() > STDERR_TAIL_LINES {
                tail.pop_front();
            }
        }
        tail.make_contiguous().join("\n")
    })
}

/// Waits for the stderr drain to finish, at most [`EXIT_GRACE`].
///
/// The drain only ends once every holder of the pipe has closed it, which
/// a lingering grandchild may never do.
async fn collect_tail(handle: JoinHandle<String>, token: &str) -> String {
    let abort = handle.abort_handle();
    match timeout(EXIT_GRACE, handle).await {
        Ok(tail) => tail.unwrap_or_default(),
        Err(_) => {
            log::warn!("[{}] yt-dlp stderr still open after {}s, dropping it", token, EXIT_GRACE.as_secs());
            abort.abort();
            String::new()
        }
    }
}

/// A running yt-dlp whose stdout has produced at least one byte.
#[derive(Debug)]
pub struct VideoStream {
    child: Child,
    stdout: ChildStdout,
    stderr: Option<JoinHandle<String>>,
    pending: Option<Bytes>,
    deadline: Instant,
    token: String,
    bytes_sent: u64,
}

/// Spawns yt-dlp for `request` and waits for its first chunk.
///
/// EOF before any byte is a failure: the exit status and stderr decide
/// between `NoFormatFound` and `DownloadFailed`.
pub async fn spawn_video_stream(
    tools: &ToolSettings,
    request: &DownloadRequest,
    token: &str,
) -> Result<VideoStream, AppError> {
    let mut cmd = Command::new(&tools.ytdlp_bin);
    cmd.args(video_args(request))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    log::info!(
        "[{}] yt-dlp video stream, format: {}",
        token,
        request.quality().format_selector()
    );

    let mut child = cmd
        .spawn()
        .map_err(|e| AppError::DownloadFailed(format!("Failed to start downloader: {}", e)))?;
    let (Some(mut stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(AppError::DownloadFailed("Downloader pipes unavailable".to_string()));
    };
    let stderr = drain_stderr(stderr, token.to_string());

    let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
    let first = match timeout(tools.ytdlp_timeout, stdout.read_buf(&mut buf)).await {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            log::error!("[{}] Failed to read from yt-dlp: {}", token, e);
            return Err(AppError::DownloadFailed(format!("Failed to read from downloader: {}", e)));
        }
        Err(_) => {
            log::error!(
                "[{}] yt-dlp produced no output within {}s, killing",
                token,
                tools.ytdlp_timeout.as_secs()
            );
            return Err(AppError::DownloadFailed(format!(
                "Downloader produced no output within {}s",
                tools.ytdlp_timeout.as_secs()
            )));
        }
    };

    if first == 0 {
        let status = match timeout(EXIT_GRACE, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                log::error!(
                    "[{}] yt-dlp closed stdout but did not exit within {}s, killing",
                    token,
                    EXIT_GRACE.as_secs()
                );
                if let Err(e) = child.start_kill() {
                    log::debug!("[{}] kill failed (already exited?): {}", token, e);
                }
                stderr.abort();
                return Err(AppError::DownloadFailed(format!(
                    "Downloader closed its output but did not exit within {}s",
                    EXIT_GRACE.as_secs()
                )));
            }
        };
        let tail = collect_tail(stderr, token).await;
        return match status {
            Ok(status) if status.success() => {
                log::error!("[{}] yt-dlp exited cleanly without output", token);
                Err(AppError::DownloadFailed("empty output".to_string()))
            }
            Ok(status) => {
                log::error!("[{}] yt-dlp {}", token, describe_exit(&status));
                Err(download_error(&tail))
            }
            Err(e) => {
                log::error!("[{}] Failed to wait for yt-dlp: {}", token, e);
                Err(download_error(&tail))
            }
        };
    }

    log::debug!("[{}] First chunk received ({} bytes)", token, first);
    Ok(VideoStream {
        child,
        stdout,
        stderr: Some(stderr),
        pending: Some(buf.freeze()),
        deadline: Instant::now() + tools.stream_timeout,
        token: token.to_string(),
        bytes_sent: 0,
    })
}

impl VideoStream {
    /// Next chunk of the pipe, `None` at EOF.
    ///
    /// The first call returns the chunk read while probing. Reads past the
    /// stream deadline fail with `TimedOut`.
    pub async fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        if let Some(chunk) = self.pending.take() {
            self.bytes_sent += chunk.len() as u64;
            return Some(Ok(chunk));
        }

        let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
        match timeout_at(self.deadline, self.stdout.read_buf(&mut buf)).await {
            Ok(Ok(0)) => None,
            Ok(Ok(n)) => {
                self.bytes_sent += n as u64;
                Some(Ok(buf.freeze()))
            }
            Ok(Err(e)) => Some(Err(e)),
            Err(_) => Some(Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "video stream exceeded its time limit",
            ))),
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Collects the exit status after EOF. A failure is only logged: the
    /// response headers are already out.
    pub async fn finish(&mut self) -> Result<(), String> {
        let status = match timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(format!("wait failed: {}", e)),
            Err(_) => {
                self.abort();
                if let Some(handle) = self.stderr.take() {
                    handle.abort();
                }
                return Err("yt-dlp did not exit after closing stdout".to_string());
            }
        };
        if status.success() {
            return Ok(());
        }

        let tail = match self.stderr.take() {
            Some(handle) => collect_tail(handle, &self.token).await,
            None => String::new(),
        };
        log::error!("[{}] yt-dlp stderr: {}", self.token, tail);
        Err(format!("yt-dlp {} after streaming started", describe_exit(&status)))
    }

    /// Kills the child right away (SIGKILL).
    pub fn abort(&mut self) {
        if let Err(e) = self.child.start_kill() {
            log::debug!("[{}] kill failed (already exited?): {}", self.token, e);
        }
    }
}

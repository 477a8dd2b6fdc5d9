#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use tubedrop::core::config::{Settings, ToolSettings};
use tubedrop::core::readiness::ReadinessHandle;
use tubedrop::core::web_server::{build_router, AppState};

use super::fixtures::{fake_ffmpeg, fake_ytdlp, FfmpegBehavior, YtDlpBehavior, JPEG_BYTES};

/// Scratch directory with fake tools, a temp dir and a thumbnail host.
pub struct TestEnv {
    pub root: TempDir,
    pub temp_dir: PathBuf,
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub thumbnails: MockServer,
}

impl TestEnv {
    pub async fn new(ytdlp: YtDlpBehavior, ffmpeg: FfmpegBehavior) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let temp_dir = root.path().join("tmp");
        std::fs::create_dir_all(&temp_dir).expect("create temp dir");

        let ytdlp = fake_ytdlp(root.path(), ytdlp);
        let ffmpeg = fake_ffmpeg(root.path(), ffmpeg);

        let thumbnails = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BYTES))
            .mount(&thumbnails)
            .await;

        Self {
            root,
            temp_dir,
            ytdlp,
            ffmpeg,
            thumbnails,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            tools: ToolSettings {
                ytdlp_bin: self.ytdlp.to_string_lossy().into_owned(),
                ffmpeg_bin: self.ffmpeg.to_string_lossy().into_owned(),
                title_timeout: Duration::from_secs(10),
                ytdlp_timeout: Duration::from_secs(10),
                ffmpeg_timeout: Duration::from_secs(10),
                stream_timeout: Duration::from_secs(60),
            },
            temp_dir: self.temp_dir.clone(),
            thumbnail_base_url: self.thumbnails.uri(),
            thumbnail_timeout: Duration::from_secs(5),
            auto_update: false,
        }
    }

    /// Router whose readiness is already `Ready`.
    pub fn router(&self) -> Router {
        self.router_with(ReadinessHandle::ready())
    }

    pub fn router_with(&self, readiness: ReadinessHandle) -> Router {
        build_router(AppState::new(self.settings(), readiness).expect("http client"))
    }

    /// Whether the fake yt-dlp ran at least once.
    pub fn ytdlp_invoked(&self) -> bool {
        self.root.path().join("ytdlp.invoked").exists()
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("infallible")
}

pub async fn body_bytes(response: Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
}

/// Names of the files left in `dir`.
pub fn temp_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

/// Polls `request` until `marker` exists and hands it back still pending.
///
/// Panics if the request completes first or the marker never shows up.
pub async fn drive_until_exists<F>(mut request: Pin<Box<F>>, marker: &Path) -> Pin<Box<F>>
where
    F: Future<Output = Response>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !marker.exists() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "{} never appeared",
            marker.display()
        );
        tokio::select! {
            response = &mut request => panic!(
                "request finished with {} before {} appeared",
                response.status(),
                marker.display()
            ),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }
    }
    request
}

pub fn read_pid(pid_file: &Path) -> u32 {
    std::fs::read_to_string(pid_file)
        .expect("read pid file")
        .trim()
        .parse()
        .expect("parse pid")
}

/// Process state letter from /proc/<pid>/stat, `None` once the pid is gone.
#[cfg(target_os = "linux")]
pub fn process_state(pid: u32) -> Option<char> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    stat.rsplit_once(')')?.1.trim_start().chars().next()
}

/// Waits up to five seconds for `pid` to exit (or turn zombie).
#[cfg(target_os = "linux")]
pub async fn wait_for_exit(pid: u32) -> bool {
    for _ in 0..50 {
        match process_state(pid) {
            None | Some('Z') => return true,
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
    false
}

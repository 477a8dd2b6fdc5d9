//! Per-request download orchestration.
//!
//! Sequences one request through its phases:
//!
//! ```text
//! Validating → ResolvingTitle → Acquiring → FetchingThumbnail → Transcoding
//!            → EmbeddingCover → Relaying → Done          (audio)
//! Validating → ResolvingTitle → Acquiring → Relaying → Done (video)
//! ```
//!
//! Any fatal error ends in `Failed`. Dropping the request future or the
//! response body before that ends in `Cancelled`: child processes die with
//! their handles and temp files with their [`TempArtifact`]s.

use std::fmt;
use std::time::Instant;

use axum::response::Response;

use crate::core::error::AppError;
use crate::core::utils::{sanitize_filename, ResolvedTitle};
use crate::core::web_server::AppState;
use crate::download::audio::acquire_audio;
use crate::download::metadata::resolve_title;
use crate::download::request::{DownloadParams, DownloadRequest, MediaType};
use crate::download::send::{relay, StreamHandle};
use crate::download::temp::{new_token, ArtifactRole, TempArtifact, TempWorkspace};
use crate::download::thumbnail::fetch_thumbnail;
use crate::download::video::spawn_video_stream;
use crate::conversion::audio::{embed_cover, transcode_to_mp3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Validating,
    ResolvingTitle,
    Acquiring,
    FetchingThumbnail,
    Transcoding,
    EmbeddingCover,
    Relaying,
    Done,
    Failed,
    Cancelled,
}

impl RequestPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::ResolvingTitle => "resolving_title",
            Self::Acquiring => "acquiring",
            Self::FetchingThumbnail => "fetching_thumbnail",
            Self::Transcoding => "transcoding",
            Self::EmbeddingCover => "embedding_cover",
            Self::Relaying => "relaying",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logs every phase transition of one request under its token.
///
/// Dropped in a non-terminal phase, it reports `Cancelled`.
#[derive(Debug)]
pub struct RequestTrace {
    token: String,
    phase: RequestPhase,
    started: Instant,
}

impl RequestTrace {
    pub fn start() -> Self {
        let token = new_token();
        log::info!("[{}] phase: {}", token, RequestPhase::Validating);
        Self {
            token,
            phase: RequestPhase::Validating,
            started: Instant::now(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Moves to `phase`. Terminal phases are final.
    pub fn enter(&mut self, phase: RequestPhase) {
        if self.phase.is_terminal() {
            return;
        }
        log::info!(
            "[{}] phase: {} -> {} (+{}ms)",
            self.token,
            self.phase,
            phase,
            self.started.elapsed().as_millis()
        );
        self.phase = phase;
    }

    pub fn done(&mut self) {
        self.enter(RequestPhase::Done);
    }

    pub fn fail(&mut self, reason: &dyn fmt::Display) {
        if !self.phase.is_terminal() {
            log::error!("[{}] failed during {}: {}", self.token, self.phase, reason);
        }
        self.enter(RequestPhase::Failed);
    }
}

impl Drop for RequestTrace {
    fn drop(&mut self) {
        if !self.phase.is_terminal() {
            log::warn!(
                "[{}] cancelled during {} after {}ms",
                self.token,
                self.phase,
                self.started.elapsed().as_millis()
            );
            self.phase = RequestPhase::Cancelled;
        }
    }
}

/// Result of the audio post-processing stages.
#[derive(Debug)]
pub enum AudioOutcome {
    /// 320 kbps MP3 with the thumbnail as front cover
    WithCover(TempArtifact),
    /// 320 kbps MP3 without cover art
    BitrateOnly { file: TempArtifact, reason: String },
}

impl AudioOutcome {
    pub fn into_file(self) -> TempArtifact {
        match self {
            AudioOutcome::WithCover(file) => file,
            AudioOutcome::BitrateOnly { file, .. } => file,
        }
    }
}

/// `<title>_<quality>.<ext>` as sent in Content-Disposition.
pub fn download_filename(title: &ResolvedTitle, request: &DownloadRequest) -> String {
    let extension = match request.media_type() {
        MediaType::Audio => "mp3",
        MediaType::Video => "mp4",
    };
    format!(
        "{}_{}.{}",
        title.filename,
        sanitize_filename(&request.quality().label()),
        extension
    )
}

/// Handles `GET /api/download/{videoId}` end to end.
pub async fn handle_download(state: &AppState, raw_id: &str, params: &DownloadParams) -> Result<Response, AppError> {
    let mut trace = RequestTrace::start();

    let prepared = prepare(state, raw_id, params, &mut trace).await;
    match prepared {
        Ok((handle, filename)) => relay(handle, filename, trace).await,
        Err(e) => {
            trace.fail(&e);
            Err(e)
        }
    }
}

async fn prepare(
    state: &AppState,
    raw_id: &str,
    params: &DownloadParams,
    trace: &mut RequestTrace,
) -> Result<(StreamHandle, String), AppError> {
    let request = DownloadRequest::new(raw_id, params)?;
    state.readiness.current().ensure_ready()?;
    log::info!(
        "[{}] {} download for {} at {}",
        trace.token(),
        request.media_type().as_str(),
        request.video_id(),
        request.quality()
    );

    trace.enter(RequestPhase::ResolvingTitle);
    let title = resolve_title(&state.settings.tools, request.video_id()).await?;
    let filename = download_filename(&title, &request);

    trace.enter(RequestPhase::Acquiring);
    let handle = match request.media_type() {
        MediaType::Video => {
            let stream = spawn_video_stream(&state.settings.tools, &request, trace.token()).await?;
            StreamHandle::Pipe(stream)
        }
        MediaType::Audio => {
            let outcome = process_audio(state, &request, trace).await?;
            if let AudioOutcome::BitrateOnly { reason, .. } = &outcome {
                log::info!("[{}] Sending audio without cover: {}", trace.token(), reason);
            }
            StreamHandle::File(outcome.into_file())
        }
    };

    Ok((handle, filename))
}

/// Audio stages: acquire → thumbnail → transcode → cover.
///
/// Only acquisition and transcoding are fatal. Intermediates are dropped
/// (and thus deleted) as soon as the next stage has consumed them.
async fn process_audio(
    state: &AppState,
    request: &DownloadRequest,
    trace: &mut RequestTrace,
) -> Result<AudioOutcome, AppError> {
    let tools = &state.settings.tools;
    let workspace = TempWorkspace::create(&state.settings.temp_dir, request.video_id(), trace.token()).await?;

    let raw = acquire_audio(tools, &workspace, request).await?;

    trace.enter(RequestPhase::FetchingThumbnail);
    let thumbnail = fetch_cover(state, &workspace, request).await;

    trace.enter(RequestPhase::Transcoding);
    let mp3 = TempArtifact::adopt(workspace.path_for(ArtifactRole::Transcoded, "mp3"));
    if let Err(e) = transcode_to_mp3(tools, raw.path(), mp3.path()).await {
        log::error!("[{}] Transcode failed: {}", trace.token(), e);
        return Err(AppError::TranscodeFailed(format!("Failed to convert audio to MP3: {}", e)));
    }
    drop(raw);

    let Some(thumbnail) = thumbnail else {
        return Ok(AudioOutcome::BitrateOnly {
            file: mp3,
            reason: "no thumbnail".to_string(),
        });
    };

    trace.enter(RequestPhase::EmbeddingCover);
    let with_cover = TempArtifact::adopt(workspace.path_for(ArtifactRole::WithCover, "mp3"));
    match embed_cover(tools, mp3.path(), thumbnail.path(), with_cover.path()).await {
        Ok(()) => {
            log::info!("[{}] Cover embedded", trace.token());
            Ok(AudioOutcome::WithCover(with_cover))
        }
        Err(e) => {
            log::warn!("[{}] Cover embedding failed, falling back: {}", trace.token(), e);
            Ok(AudioOutcome::BitrateOnly {
                file: mp3,
                reason: e.to_string(),
            })
        }
    }
}

/// Best effort: any failure means no cover.
async fn fetch_cover(state: &AppState, workspace: &TempWorkspace, request: &DownloadRequest) -> Option<TempArtifact> {
    let thumbnail = TempArtifact::adopt(workspace.path_for(ArtifactRole::Thumbnail, "jpg"));
    match fetch_thumbnail(
        &state.http,
        &state.settings.thumbnail_base_url,
        request.video_id(),
        thumbnail.path(),
    )
    .await
    {
        Ok(_) => Some(thumbnail),
        Err(e) => {
            log::warn!("[{}] Thumbnail unavailable: {}", workspace.token(), e);
            None
        }
    }
}

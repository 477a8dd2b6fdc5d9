//! Streaming relay: turns the final byte source into the HTTP response.
//!
//! The response body owns everything the transfer still needs: the yt-dlp
//! child for a pipe, the [`TempArtifact`] for a file, and the request's
//! [`RequestTrace`]. When the body finishes the trace moves to `Done`;
//! when it is dropped early (client gone) ownership tears everything down.

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::io;
use tokio_util::io::ReaderStream;

use crate::core::error::AppError;
use crate::download::pipeline::{RequestPhase, RequestTrace};
use crate::download::temp::TempArtifact;
use crate::download::video::VideoStream;

pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// The byte source delivered to the client.
#[derive(Debug)]
pub enum StreamHandle {
    /// Live yt-dlp stdout
    Pipe(VideoStream),
    /// Finished file in the temp directory
    File(TempArtifact),
}

/// `attachment; filename="<name>"`. `name` is already restricted to
/// `[A-Za-z0-9_.]`.
pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

/// Builds the streaming response for `handle`.
pub async fn relay(handle: StreamHandle, filename: String, mut trace: RequestTrace) -> Result<Response, AppError> {
    trace.enter(RequestPhase::Relaying);
    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| AppError::DownloadFailed(format!("Invalid filename header: {}", e)));
    let disposition = match disposition {
        Ok(value) => value,
        Err(e) => {
            trace.fail(&e);
            return Err(e);
        }
    };

    let response = match handle {
        StreamHandle::Pipe(stream) => {
            log::info!("[{}] Streaming {} from yt-dlp", trace.token(), filename);
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, VIDEO_CONTENT_TYPE)
                .header(CONTENT_DISPOSITION, disposition)
                .body(pipe_body(stream, trace))
        }
        StreamHandle::File(artifact) => {
            let opened = open_artifact(&artifact).await;
            let (file, size) = match opened {
                Ok(opened) => opened,
                Err(e) => {
                    trace.fail(&e);
                    return Err(e.into());
                }
            };
            log::info!("[{}] Sending {} ({} bytes)", trace.token(), filename, size);
            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, AUDIO_CONTENT_TYPE)
                .header(CONTENT_LENGTH, size)
                .header(CONTENT_DISPOSITION, disposition)
                .body(file_body(file, artifact, trace))
        }
    };

    response.map_err(|e| AppError::DownloadFailed(format!("Failed to build response: {}", e)))
}

async fn open_artifact(artifact: &TempArtifact) -> io::Result<(tokio::fs::File, u64)> {
    let file = tokio::fs::File::open(artifact.path()).await?;
    let size = file.metadata().await?.len();
    Ok((file, size))
}

struct PipeRelay {
    stream: VideoStream,
    trace: RequestTrace,
}

/// Body over a live pipe. Dropping it drops the child, which kills it.
fn pipe_body(stream: VideoStream, trace: RequestTrace) -> Body {
    let body = stream::unfold(Some(PipeRelay { stream, trace }), |state| async move {
        let mut relay = state?;
        match relay.stream.next_chunk().await {
            Some(Ok(chunk)) => Some((Ok(chunk), Some(relay))),
            Some(Err(e)) => {
                relay.stream.abort();
                relay.trace.fail(&format!("stream aborted after {} bytes: {}", relay.stream.bytes_sent(), e));
                Some((Err(e), None))
            }
            None => {
                match relay.stream.finish().await {
                    Ok(()) => {
                        log::info!("[{}] Streamed {} bytes", relay.trace.token(), relay.stream.bytes_sent());
                        relay.trace.done();
                    }
                    Err(reason) => relay.trace.fail(&reason),
                }
                None
            }
        }
    });
    Body::from_stream(body)
}

struct FileRelay {
    reader: ReaderStream<tokio::fs::File>,
    artifact: TempArtifact,
    trace: RequestTrace,
}

/// Body over a finished file. The artifact is deleted once the body is
/// drained or dropped, never before.
fn file_body(file: tokio::fs::File, artifact: TempArtifact, trace: RequestTrace) -> Body {
    let relay = FileRelay {
        reader: ReaderStream::new(file),
        artifact,
        trace,
    };
    let body = stream::unfold(Some(relay), |state| async move {
        let mut relay = state?;
        match relay.reader.next().await {
            Some(Ok(chunk)) => Some((Ok::<Bytes, io::Error>(chunk), Some(relay))),
            Some(Err(e)) => {
                relay.trace.fail(&e);
                Some((Err(e), None))
            }
            None => {
                log::debug!("[{}] Finished sending {}", relay.trace.token(), relay.artifact.path().display());
                relay.trace.done();
                None
            }
        }
    });
    Body::from_stream(body)
}

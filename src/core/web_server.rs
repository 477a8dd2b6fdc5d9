//! Public HTTP API.
//!
//! - `/`                         - service banner
//! - `/api/health`               - liveness, always 200
//! - `/api/ready`                - 200 once setup is done, 503 before
//! - `/api/download/{video_id}`  - media download

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::core::config::Settings;
use crate::core::error::AppError;
use crate::core::readiness::{Readiness, ReadinessHandle};
use crate::download::{handle_download, DownloadParams};

pub const SERVICE_NAME: &str = "tubedrop";

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub readiness: ReadinessHandle,
    pub http: reqwest::Client,
    pub started: Instant,
}

impl AppState {
    pub fn new(settings: Settings, readiness: ReadinessHandle) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(settings.thumbnail_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            settings: Arc::new(settings),
            readiness,
            http,
            started: Instant::now(),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .route("/api/ready", get(ready_handler))
        .route("/api/download/{video_id}", get(download_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the public web server.
pub async fn start_web_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);

    log::info!("Starting web server on http://{}", addr);
    log::info!("  /api/health                      - Health check");
    log::info!("  /api/ready                       - Readiness check");
    log::info!("  /api/download/{{video_id}}         - Download (quality, type)");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "YouTube downloader API is running",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness only: answers 200 whatever the readiness phase.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let health_status = json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.started.elapsed().as_secs(),
        "readiness": state.readiness.current().label(),
    });

    (StatusCode::OK, Json(health_status))
}

async fn ready_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.readiness.current() {
        Readiness::Ready => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Readiness::Initializing => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "initializing",
                "message": "Service is still initializing",
            })),
        ),
        Readiness::Failed(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "failed",
                "message": reason,
            })),
        ),
    }
}

async fn download_handler(
    Path(video_id): Path<String>,
    params: Result<Query<DownloadParams>, QueryRejection>,
    State(state): State<AppState>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            log::warn!("Rejected download query for {}: {}", video_id, rejection.body_text());
            return AppError::InvalidArgument(rejection.body_text()).into_response();
        }
    };
    match handle_download(&state, &video_id, &params).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn settings(temp_dir: &std::path::Path) -> Settings {
        Settings {
            tools: crate::core::config::ToolSettings {
                ytdlp_bin: "/nonexistent/yt-dlp".to_string(),
                ffmpeg_bin: "/nonexistent/ffmpeg".to_string(),
                title_timeout: Duration::from_secs(5),
                ytdlp_timeout: Duration::from_secs(5),
                ffmpeg_timeout: Duration::from_secs(5),
                stream_timeout: Duration::from_secs(5),
            },
            temp_dir: temp_dir.to_path_buf(),
            thumbnail_base_url: "http://127.0.0.1:9".to_string(),
            thumbnail_timeout: Duration::from_secs(1),
            auto_update: false,
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_root_banner() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(settings(dir.path()), ReadinessHandle::ready()).unwrap();
        let (status, body) = get_json(build_router(state), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], SERVICE_NAME);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_ready_reflects_channel() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, readiness) = ReadinessHandle::channel();
        let state = AppState::new(settings(dir.path()), readiness).unwrap();
        let app = build_router(state);

        let (status, body) = get_json(app.clone(), "/api/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        tx.send(Readiness::Failed("ffmpeg missing".into())).unwrap();
        let (status, body) = get_json(app.clone(), "/api/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "failed");
        assert_eq!(body["message"], "ffmpeg missing");

        tx.send(Readiness::Ready).unwrap();
        let (status, body) = get_json(app, "/api/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_invalid_id_is_400_even_when_initializing() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, readiness) = ReadinessHandle::channel();
        let state = AppState::new(settings(dir.path()), readiness).unwrap();
        let (status, body) = get_json(build_router(state), "/api/download/short").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid video ID");
    }

    #[tokio::test]
    async fn test_download_refused_while_initializing() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, readiness) = ReadinessHandle::channel();
        let state = AppState::new(settings(dir.path()), readiness).unwrap();
        let (status, body) = get_json(build_router(state), "/api/download/dQw4w9WgXcQ").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_query_is_json_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(settings(dir.path()), ReadinessHandle::ready()).unwrap();
        let (status, body) = get_json(
            build_router(state),
            "/api/download/dQw4w9WgXcQ?type=audio&type=video",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("type"), "{}", body);
    }

    #[tokio::test]
    async fn test_cors_header_present() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(settings(dir.path()), ReadinessHandle::ready()).unwrap();
        let response = build_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("Origin", "https://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}

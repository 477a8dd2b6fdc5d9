use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Centralized error types for the application
///
/// Every failure a download request can hit is converted to this enum, which
/// maps one-to-one onto the HTTP status returned to the client.
///
/// # Example
///
/// ```
/// use tubedrop::core::error::AppError;
///
/// let err = AppError::InvalidArgument("Invalid video ID".into());
/// assert_eq!(err.status_code().as_u16(), 400);
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed client input (bad video id, unknown media type)
    #[error("{0}")]
    InvalidArgument(String),

    /// Title lookup failed, so no response filename can be built
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// yt-dlp exited non-zero, timed out or produced no file
    #[error("{0}")]
    DownloadFailed(String),

    /// yt-dlp reported that no format matches the requested selector
    #[error("{0}")]
    NoFormatFound(String),

    /// ffmpeg could not normalize the downloaded audio
    #[error("{0}")]
    TranscodeFailed(String),

    /// Startup setup has not completed (or failed), downloads are refused
    #[error("{0}")]
    ServiceInitializing(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NoFormatFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceInitializing(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UpstreamUnavailable(_)
            | AppError::DownloadFailed(_)
            | AppError::TranscodeFailed(_)
            | AppError::Http(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::DownloadFailed(_) => "download_failed",
            AppError::NoFormatFound(_) => "no_format_found",
            AppError::TranscodeFailed(_) => "transcode_failed",
            AppError::ServiceInitializing(_) => "service_initializing",
            AppError::Http(_) => "http",
            AppError::Io(_) => "io",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed ({}): {}", self.kind(), self);
        } else {
            log::warn!("Request rejected ({}): {}", self.kind(), self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

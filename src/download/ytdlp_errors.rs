//! Classification of yt-dlp failures
//!
//! Maps yt-dlp's stderr onto a small set of causes so the client gets a
//! meaningful status (404 for "no such format", 500 otherwise) and the log
//! gets a hint on how to fix it.

use crate::core::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YtDlpErrorType {
    /// No format matches the selector
    FormatUnavailable,
    /// YouTube asked for a sign-in / flagged the request as a bot
    BotDetection,
    /// Private, removed or region-blocked video
    VideoUnavailable,
    /// Timeouts, DNS, refused connections
    NetworkError,
    Unknown,
}

/// Determines the error type from yt-dlp's stderr.
pub fn analyze_ytdlp_error(stderr: &str) -> YtDlpErrorType {
    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("requested format is not available") || stderr_lower.contains("no video formats found")
    {
        return YtDlpErrorType::FormatUnavailable;
    }

    if stderr_lower.contains("sign in to confirm you're not a bot")
        || stderr_lower.contains("please sign in")
        || stderr_lower.contains("http error 403")
        || stderr_lower.contains("signature extraction failed")
    {
        return YtDlpErrorType::BotDetection;
    }

    if stderr_lower.contains("private video")
        || stderr_lower.contains("video unavailable")
        || stderr_lower.contains("video is not available")
        || stderr_lower.contains("video has been removed")
        || stderr_lower.contains("this video does not exist")
    {
        return YtDlpErrorType::VideoUnavailable;
    }

    if stderr_lower.contains("timed out")
        || stderr_lower.contains("connection")
        || stderr_lower.contains("network")
        || stderr_lower.contains("failed to resolve")
        || stderr_lower.contains("name or service not known")
    {
        return YtDlpErrorType::NetworkError;
    }

    YtDlpErrorType::Unknown
}

/// Message returned to the client.
pub fn get_error_message(error_type: YtDlpErrorType) -> &'static str {
    match error_type {
        YtDlpErrorType::FormatUnavailable => "No downloadable format found for the requested quality",
        YtDlpErrorType::BotDetection => "YouTube blocked the request, try again later",
        YtDlpErrorType::VideoUnavailable => "Video is unavailable (private, removed or region-blocked)",
        YtDlpErrorType::NetworkError => "Network error while downloading, try again later",
        YtDlpErrorType::Unknown => "Download failed",
    }
}

/// Operator-facing hint for the log.
pub fn get_fix_recommendations(error_type: YtDlpErrorType) -> &'static str {
    match error_type {
        YtDlpErrorType::FormatUnavailable => "Try a lower quality tier or list formats with `yt-dlp -F`",
        YtDlpErrorType::BotDetection => "Update yt-dlp (YTDL_AUTO_UPDATE=true) or change egress IP",
        YtDlpErrorType::VideoUnavailable => "Nothing to fix, the video cannot be fetched",
        YtDlpErrorType::NetworkError => "Check outbound connectivity and DNS",
        YtDlpErrorType::Unknown => "Inspect the yt-dlp stderr above",
    }
}

/// Turns a failed yt-dlp run into the matching [`AppError`].
pub fn download_error(stderr: &str) -> AppError {
    let error_type = analyze_ytdlp_error(stderr);
    log::error!("yt-dlp failed, error type: {:?}", error_type);
    log::error!("yt-dlp stderr: {}", stderr);
    log::info!("Fix hint: {}", get_fix_recommendations(error_type));

    let message = get_error_message(error_type).to_string();
    match error_type {
        YtDlpErrorType::FormatUnavailable => AppError::NoFormatFound(message),
        _ => AppError::DownloadFailed(message),
    }
}

//! Thumbnail fetching for audio cover art.
//!
//! The high-resolution image is tried first; a 404 falls back to the
//! lower-resolution tier once. Every failure is reported to the caller,
//! which proceeds without cover art.

use bytes::BytesMut;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};

use crate::core::error::AppError;
use crate::core::validation::VideoId;

/// Image tiers, tried in order.
pub const THUMBNAIL_TIERS: [&str; 2] = ["maxresdefault.jpg", "hqdefault.jpg"];

/// Largest image body accepted (5 MB)
pub const MAX_THUMBNAIL_BYTES: u64 = 5 * 1024 * 1024;

/// Image format detected by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Unknown,
}

/// Detects image format from the first bytes of a file (magic bytes)
pub(crate) fn detect_image_format(bytes: &[u8]) -> ImageFormat {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,
        [0x89, 0x50, 0x4E, 0x47, ..] => ImageFormat::Png,
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => ImageFormat::WebP,
        _ => ImageFormat::Unknown,
    }
}

pub fn thumbnail_url(base_url: &str, video_id: &VideoId, tier: &str) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), video_id, tier)
}

/// Downloads the thumbnail of `video_id` into `dest`.
///
/// Returns `dest` on success. Only a 404 on the first tier triggers the
/// fallback; any other status or transport error fails immediately.
pub async fn fetch_thumbnail(
    client: &Client,
    base_url: &str,
    video_id: &VideoId,
    dest: &Path,
) -> Result<PathBuf, AppError> {
    for (index, tier) in THUMBNAIL_TIERS.iter().enumerate() {
        let url = thumbnail_url(base_url, video_id, tier);
        log::debug!("[THUMBNAIL] GET {}", url);

        let mut response = client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND && index + 1 < THUMBNAIL_TIERS.len() {
            log::info!("[THUMBNAIL] {} not found, falling back to {}", tier, THUMBNAIL_TIERS[index + 1]);
            continue;
        }
        if !status.is_success() {
            return Err(AppError::DownloadFailed(format!(
                "Thumbnail request failed with status: {}",
                status
            )));
        }

        if let Some(len) = response.content_length().filter(|len| *len > MAX_THUMBNAIL_BYTES) {
            return Err(too_large(&url, len));
        }
        // Chunked responses carry no length, so the cap is also enforced while reading
        let mut bytes = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            let len = (bytes.len() + chunk.len()) as u64;
            if len > MAX_THUMBNAIL_BYTES {
                return Err(too_large(&url, len));
            }
            bytes.extend_from_slice(&chunk);
        }
        if detect_image_format(&bytes) == ImageFormat::Unknown {
            return Err(AppError::DownloadFailed(format!(
                "Thumbnail at {} is not a recognised image",
                url
            )));
        }

        fs_err::tokio::write(dest, &bytes).await?;
        log::info!(
            "[THUMBNAIL] Saved {} ({} KB)",
            tier,
            bytes.len() as f64 / 1024.0
        );
        return Ok(dest.to_path_buf());
    }

    Err(AppError::DownloadFailed("No thumbnail available".to_string()))
}

fn too_large(url: &str, len: u64) -> AppError {
    AppError::DownloadFailed(format!(
        "Thumbnail at {} exceeds {} bytes ({} bytes)",
        url, MAX_THUMBNAIL_BYTES, len
    ))
}

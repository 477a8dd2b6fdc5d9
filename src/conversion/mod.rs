//! ffmpeg post-processing of downloaded audio.
//!
//! Two steps, both delegated to ffmpeg:
//! - normalization to a 320 kbps MP3
//! - muxing a thumbnail in as ID3v2 front cover

pub mod audio;

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during conversion
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("Output creation failed: {0}")]
    OutputFailed(String),

    #[error("FFmpeg timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type ConversionResult<T> = Result<T, ConversionError>;

/// Get file size in bytes
pub async fn get_file_size<P: AsRef<Path>>(path: P) -> ConversionResult<u64> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(metadata.len())
}

/// Fails unless `path` exists and is non-empty.
pub(crate) async fn ensure_output(path: &Path) -> ConversionResult<()> {
    match get_file_size(path).await {
        Ok(0) => Err(ConversionError::OutputFailed(format!("{} is empty", path.display()))),
        Ok(_) => Ok(()),
        Err(_) => Err(ConversionError::OutputFailed(format!("{} was not created", path.display()))),
    }
}

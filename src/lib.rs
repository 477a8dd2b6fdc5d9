//! tubedrop - HTTP service for downloading YouTube media
//!
//! All media work is delegated to `yt-dlp` and `ffmpeg`; this crate
//! orchestrates them per request, relays the result to the client and
//! guarantees that no temporary file outlives its request.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging, process helpers, readiness and the HTTP server
//! - `download`: Request model, yt-dlp acquisition, thumbnails, orchestration and relay
//! - `conversion`: ffmpeg post-processing (320 kbps MP3, cover art)

pub mod cli;
pub mod conversion;
pub mod core;
pub mod download;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult, Settings};
pub use download::{handle_download, DownloadRequest};

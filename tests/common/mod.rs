//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;
pub mod helpers;

#[allow(unused_imports)]
pub use fixtures::{fake_ffmpeg, fake_ytdlp, FfmpegBehavior, YtDlpBehavior, FAKE_TITLE, JPEG_BYTES};
#[allow(unused_imports)]
pub use helpers::{body_bytes, drive_until_exists, get, read_pid, temp_files, TestEnv};
#[cfg(target_os = "linux")]
#[allow(unused_imports)]
pub use helpers::{process_state, wait_for_exit};

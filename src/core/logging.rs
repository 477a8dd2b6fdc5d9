//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A one-shot report of the external tool configuration

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config::Settings;

/// Parses a level name, defaulting to Info for anything unknown.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
/// * `level` - Level name (see [`parse_level`])
pub fn init_logger(log_file_path: &str, level: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
    let level = parse_level(level);

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the tool binaries, directories and timeouts the server runs with.
pub fn log_tool_configuration(settings: &Settings) {
    log::info!("Tool configuration:");
    log::info!("  yt-dlp:        {}", settings.tools.ytdlp_bin);
    log::info!("  ffmpeg:        {}", settings.tools.ffmpeg_bin);
    log::info!("  temp dir:      {}", settings.temp_dir.display());
    log::info!("  thumbnails:    {}", settings.thumbnail_base_url);
    log::info!("  auto-update:   {}", settings.auto_update);
    log::info!(
        "  timeouts:      title {}s, download {}s, ffmpeg {}s, stream {}s",
        settings.tools.title_timeout.as_secs(),
        settings.tools.ytdlp_timeout.as_secs(),
        settings.tools.ffmpeg_timeout.as_secs(),
        settings.tools.stream_timeout.as_secs()
    );

    if !settings.temp_dir.is_dir() {
        log::warn!(
            "Temp dir {} does not exist yet, it will be created on first download",
            settings.temp_dir.display()
        );
    }
}

use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Reads a variable, treating empty/whitespace values as unset.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    non_empty_var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_bool_var(key: &str) -> bool {
    matches!(
        non_empty_var(key).map(|v| v.to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| non_empty_var("YTDL_BIN").unwrap_or_else(|| "yt-dlp".to_string()));

/// Cached ffmpeg binary path
/// Read from FFMPEG_BIN, defaults to "ffmpeg"
pub static FFMPEG_BIN: Lazy<String> =
    Lazy::new(|| non_empty_var("FFMPEG_BIN").unwrap_or_else(|| "ffmpeg".to_string()));

/// Run `yt-dlp -U` during startup setup
/// Read from YTDL_AUTO_UPDATE (1/true/yes/on), default off
pub static YTDL_AUTO_UPDATE: Lazy<bool> = Lazy::new(|| parse_bool_var("YTDL_AUTO_UPDATE"));

/// Temporary files directory for per-request artifacts
/// Read from TEMP_FILES_DIR environment variable
/// Defaults to the system temp dir, supports tilde (~) expansion
pub static TEMP_FILES_DIR: Lazy<PathBuf> = Lazy::new(|| match non_empty_var("TEMP_FILES_DIR") {
    Some(dir) => PathBuf::from(shellexpand::tilde(&dir).into_owned()),
    None => env::temp_dir(),
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: tubedrop.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| non_empty_var("LOG_FILE_PATH").unwrap_or_else(|| "tubedrop.log".to_string()));

/// Log level (error, warn, info, debug, trace)
/// Read from LOG_LEVEL, default info
pub static LOG_LEVEL: Lazy<String> =
    Lazy::new(|| non_empty_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()));

/// HTTP server configuration
pub mod server {
    use super::{non_empty_var, parse_var, Lazy};

    pub const DEFAULT_PORT: u16 = 3000;

    /// Listening port, read from PORT
    pub static PORT: Lazy<u16> = Lazy::new(|| parse_var("PORT", DEFAULT_PORT));

    /// Bind address, read from BIND_ADDR
    pub static BIND_ADDR: Lazy<String> =
        Lazy::new(|| non_empty_var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()));
}

/// Thumbnail endpoint configuration
pub mod thumbnail {
    use super::{non_empty_var, parse_var, Duration, Lazy};

    pub const DEFAULT_BASE_URL: &str = "https://img.youtube.com/vi";

    /// Timeout for a single thumbnail request (in seconds)
    pub const TIMEOUT_SECS: u64 = 15;

    /// Image host, `<base>/<id>/<tier>.jpg`. Read from THUMBNAIL_BASE_URL
    pub static BASE_URL: Lazy<String> = Lazy::new(|| {
        non_empty_var("THUMBNAIL_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    });

    pub fn timeout() -> Duration {
        Duration::from_secs(parse_var("THUMBNAIL_TIMEOUT_SECS", TIMEOUT_SECS))
    }
}

/// Download configuration
pub mod download {
    use super::{parse_var, Duration};

    /// Timeout for the title lookup (in seconds)
    pub const TITLE_TIMEOUT_SECS: u64 = 60;

    /// Timeout for yt-dlp audio downloads (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 240; // 4 minutes

    /// Timeout for a single ffmpeg step (in seconds)
    pub const FFMPEG_TIMEOUT_SECS: u64 = 120;

    /// Upper bound on a live video stream (in seconds)
    pub const STREAM_TIMEOUT_SECS: u64 = 1800; // 30 minutes

    pub fn title_timeout() -> Duration {
        Duration::from_secs(parse_var("TITLE_TIMEOUT_SECS", TITLE_TIMEOUT_SECS))
    }

    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(parse_var("YTDLP_TIMEOUT_SECS", YTDLP_TIMEOUT_SECS))
    }

    pub fn ffmpeg_timeout() -> Duration {
        Duration::from_secs(parse_var("FFMPEG_TIMEOUT_SECS", FFMPEG_TIMEOUT_SECS))
    }

    pub fn stream_timeout() -> Duration {
        Duration::from_secs(parse_var("STREAM_TIMEOUT_SECS", STREAM_TIMEOUT_SECS))
    }
}

/// External tool invocation settings.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    pub title_timeout: Duration,
    pub ytdlp_timeout: Duration,
    pub ffmpeg_timeout: Duration,
    pub stream_timeout: Duration,
}

/// Snapshot of the runtime configuration handed to the server state.
///
/// Built from the environment in production; tests construct it directly to
/// point at fake tools and scratch directories.
#[derive(Debug, Clone)]
pub struct Settings {
    pub tools: ToolSettings,
    pub temp_dir: PathBuf,
    pub thumbnail_base_url: String,
    pub thumbnail_timeout: Duration,
    pub auto_update: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            tools: ToolSettings {
                ytdlp_bin: YTDL_BIN.clone(),
                ffmpeg_bin: FFMPEG_BIN.clone(),
                title_timeout: download::title_timeout(),
                ytdlp_timeout: download::ytdlp_timeout(),
                ffmpeg_timeout: download::ffmpeg_timeout(),
                stream_timeout: download::stream_timeout(),
            },
            temp_dir: TEMP_FILES_DIR.clone(),
            thumbnail_base_url: thumbnail::BASE_URL.clone(),
            thumbnail_timeout: thumbnail::timeout(),
            auto_update: *YTDL_AUTO_UPDATE,
        }
    }
}

//! Input validation for download requests
//!
//! Only 11-character YouTube video identifiers are accepted. Validation runs
//! before any external process is spawned.

use lazy_regex::regex_is_match;
use std::fmt;

use crate::core::error::AppError;

/// Length of a YouTube video identifier
pub const VIDEO_ID_LEN: usize = 11;

/// A validated YouTube video identifier (`[A-Za-z0-9_-]{11}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Validates a raw identifier.
    ///
    /// # Examples
    /// ```
    /// use tubedrop::core::validation::VideoId;
    ///
    /// assert!(VideoId::parse("dQw4w9WgXcQ").is_ok());
    /// assert!(VideoId::parse("dQw4w9WgXc").is_err()); // 10 chars
    /// assert!(VideoId::parse("dQw4w9WgXc!").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if regex_is_match!(r"^[A-Za-z0-9_-]{11}$", raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(AppError::InvalidArgument("Invalid video ID".to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL handed to yt-dlp.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

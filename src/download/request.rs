//! Download request model: media type, quality tiers and yt-dlp format
//! selectors.

use serde::Deserialize;
use std::fmt;

use crate::core::error::AppError;
use crate::core::validation::VideoId;

/// Default quality when the query omits it
pub const DEFAULT_QUALITY: &str = "720";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Video,
    Audio,
}

impl MediaType {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim) {
            None | Some("") | Some("video") => Ok(Self::Video),
            Some("audio") => Ok(Self::Audio),
            Some(other) => Err(AppError::InvalidArgument(format!(
                "Invalid type '{}', expected video or audio",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Height-capped video tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoTier {
    P2160,
    P1440,
    P1080,
    P720,
    P480,
    P360,
    /// Anything not in the list above, kept for the filename
    Other(String),
}

impl VideoTier {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().trim_end_matches('p') {
            "2160" => Self::P2160,
            "1440" => Self::P1440,
            "1080" => Self::P1080,
            "720" => Self::P720,
            "480" => Self::P480,
            "360" => Self::P360,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn height(&self) -> Option<u32> {
        match self {
            Self::P2160 => Some(2160),
            Self::P1440 => Some(1440),
            Self::P1080 => Some(1080),
            Self::P720 => Some(720),
            Self::P480 => Some(480),
            Self::P360 => Some(360),
            Self::Other(_) => None,
        }
    }

    /// Pre-DASH progressive itag tried when no height-capped format matches.
    fn legacy_format(&self) -> Option<&'static str> {
        match self {
            Self::P2160 | Self::P1440 | Self::P1080 | Self::P720 => Some("22"),
            Self::P480 | Self::P360 => Some("18"),
            Self::Other(_) => None,
        }
    }

    /// yt-dlp `-f` selector for this tier.
    ///
    /// Only single-file formats are chosen: merging separate video and audio
    /// streams cannot be written to a pipe.
    pub fn format_selector(&self) -> String {
        match (self.height(), self.legacy_format()) {
            (Some(h), Some(legacy)) => format!("best[height<={h}][ext=mp4]/best[height<={h}]/{legacy}"),
            _ => "best[ext=mp4]/best".to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self.height() {
            Some(h) => h.to_string(),
            None => match self {
                Self::Other(label) if !label.is_empty() => label.clone(),
                _ => "best".to_string(),
            },
        }
    }
}

/// Audio stream preference tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioTier {
    High,
    Medium,
    Low,
}

impl AudioTier {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "audio_high" => Some(Self::High),
            "audio_medium" => Some(Self::Medium),
            "audio_low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn format_selector(&self) -> &'static str {
        match self {
            Self::High => "bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio/best",
            Self::Medium => "bestaudio[abr<=160]/bestaudio[ext=m4a]/bestaudio/best",
            Self::Low => "worstaudio[ext=m4a]/worstaudio/bestaudio/best",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "audio_high",
            Self::Medium => "audio_medium",
            Self::Low => "audio_low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quality {
    Video(VideoTier),
    Audio(AudioTier),
}

impl Quality {
    /// Resolves the raw `quality` value against the media type.
    ///
    /// Audio requests with a non-audio tier fall back to `audio_high`; video
    /// requests with an `audio_*` tier are treated as unrecognized.
    pub fn resolve(raw: Option<&str>, media_type: MediaType) -> Self {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_QUALITY);
        match media_type {
            MediaType::Audio => Self::Audio(AudioTier::parse(raw).unwrap_or(AudioTier::High)),
            MediaType::Video => Self::Video(VideoTier::parse(raw)),
        }
    }

    pub fn format_selector(&self) -> String {
        match self {
            Self::Video(tier) => tier.format_selector(),
            Self::Audio(tier) => tier.format_selector().to_string(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Video(tier) => tier.label(),
            Self::Audio(tier) => tier.label().to_string(),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Raw query string of `/api/download/{videoId}`.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    pub quality: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

/// A validated, immutable download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    video_id: VideoId,
    quality: Quality,
    media_type: MediaType,
}

impl DownloadRequest {
    pub fn new(raw_id: &str, params: &DownloadParams) -> Result<Self, AppError> {
        let video_id = VideoId::parse(raw_id)?;
        let media_type = MediaType::parse(params.media_type.as_deref())?;
        let quality = Quality::resolve(params.quality.as_deref(), media_type);
        Ok(Self {
            video_id,
            quality,
            media_type,
        })
    }

    pub fn video_id(&self) -> &VideoId {
        &self.video_id
    }

    pub fn quality(&self) -> &Quality {
        &self.quality
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(quality: Option<&str>, media_type: Option<&str>) -> DownloadParams {
        DownloadParams {
            quality: quality.map(String::from),
            media_type: media_type.map(String::from),
        }
    }

    #[test]
    fn test_defaults_are_720_video() {
        let req = DownloadRequest::new("dQw4w9WgXcQ", &DownloadParams::default()).unwrap();
        assert_eq!(req.media_type(), MediaType::Video);
        assert_eq!(req.quality(), &Quality::Video(VideoTier::P720));
    }

    #[test]
    fn test_invalid_id_rejected_first() {
        let err = DownloadRequest::new("bad", &params(None, Some("nonsense"))).unwrap_err();
        assert_eq!(err.to_string(), "Invalid video ID");
    }

    #[test]
    fn test_invalid_media_type() {
        let err = DownloadRequest::new("dQw4w9WgXcQ", &params(None, Some("podcast"))).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_video_selectors() {
        assert_eq!(
            VideoTier::P1080.format_selector(),
            "best[height<=1080][ext=mp4]/best[height<=1080]/22"
        );
        assert_eq!(VideoTier::P360.format_selector(), "best[height<=360][ext=mp4]/best[height<=360]/18");
        assert_eq!(VideoTier::parse("999").format_selector(), "best[ext=mp4]/best");
    }

    #[test]
    fn test_video_tier_accepts_p_suffix() {
        assert_eq!(VideoTier::parse("1440p"), VideoTier::P1440);
        assert_eq!(VideoTier::parse("4k"), VideoTier::Other("4k".into()));
    }

    #[test]
    fn test_audio_quality_fallback() {
        assert_eq!(
            Quality::resolve(Some("720"), MediaType::Audio),
            Quality::Audio(AudioTier::High)
        );
        assert_eq!(
            Quality::resolve(Some("audio_low"), MediaType::Audio),
            Quality::Audio(AudioTier::Low)
        );
        assert_eq!(
            Quality::resolve(Some("audio_low"), MediaType::Video),
            Quality::Video(VideoTier::Other("audio_low".into()))
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(Quality::Video(VideoTier::P480).label(), "480");
        assert_eq!(Quality::Audio(AudioTier::Medium).label(), "audio_medium");
        assert_eq!(Quality::Video(VideoTier::Other(String::new())).label(), "best");
    }
}

//! MP3 normalization and cover embedding.

use super::{ensure_output, ConversionError, ConversionResult};
use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;

use crate::core::config::ToolSettings;
use crate::core::process::{run_with_timeout, stderr_tail, ProcessError};

/// Target bitrate of every audio download
pub const MP3_BITRATE: &str = "320k";

/// ffmpeg arguments for `<input>` → 320 kbps MP3 at `<output>`.
pub fn transcode_args(input: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.into()];
    args.extend(
        ["-vn", "-acodec", "libmp3lame", "-b:a", MP3_BITRATE]
            .iter()
            .map(OsString::from),
    );
    args.push(output.into());
    args
}

/// ffmpeg arguments muxing `cover` into `mp3` as the front cover, streams copied.
pub fn embed_cover_args(mp3: &Path, cover: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), mp3.into(), "-i".into(), cover.into()];
    args.extend(
        [
            "-map",
            "0:a",
            "-map",
            "1:0",
            "-c",
            "copy",
            "-id3v2_version",
            "3",
            "-metadata:s:v",
            "title=Album cover",
            "-metadata:s:v",
            "comment=Cover (front)",
        ]
        .iter()
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

async fn run_ffmpeg(tools: &ToolSettings, args: Vec<OsString>, output: &Path) -> ConversionResult<()> {
    let mut cmd = Command::new(&tools.ffmpeg_bin);
    cmd.args(&args);

    let result = run_with_timeout(&mut cmd, tools.ffmpeg_timeout).await.map_err(|e| match e {
        ProcessError::Spawn { source, .. } => ConversionError::IoError(source),
        ProcessError::TimedOut { timeout, .. } => ConversionError::TimedOut(timeout),
    })?;

    if !result.status.success() {
        let stderr = stderr_tail(&result.stderr, 20);
        log::error!("FFmpeg error: {}", stderr);
        return Err(ConversionError::FfmpegError(stderr));
    }

    ensure_output(output).await
}

/// Normalizes `input` to a 320 kbps MP3 written at `output`.
pub async fn transcode_to_mp3(tools: &ToolSettings, input: &Path, output: &Path) -> ConversionResult<()> {
    if !input.exists() {
        return Err(ConversionError::InputNotFound(input.display().to_string()));
    }
    log::debug!("Transcoding {} -> {}", input.display(), output.display());
    run_ffmpeg(tools, transcode_args(input, output), output).await
}

/// Writes `mp3` with `cover` attached as ID3v2.3 front cover to `output`.
pub async fn embed_cover(tools: &ToolSettings, mp3: &Path, cover: &Path, output: &Path) -> ConversionResult<()> {
    for input in [mp3, cover] {
        if !input.exists() {
            return Err(ConversionError::InputNotFound(input.display().to_string()));
        }
    }
    log::debug!("Embedding cover {} into {}", cover.display(), mp3.display());
    run_ffmpeg(tools, embed_cover_args(mp3, cover, output), output).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn tools(ffmpeg: &str) -> ToolSettings {
        ToolSettings {
            ytdlp_bin: "yt-dlp".to_string(),
            ffmpeg_bin: ffmpeg.to_string(),
            title_timeout: Duration::from_secs(5),
            ytdlp_timeout: Duration::from_secs(5),
            ffmpeg_timeout: Duration::from_secs(5),
            stream_timeout: Duration::from_secs(5),
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_transcode_args() {
        let args = transcode_args(Path::new("/t/in.webm"), Path::new("/t/out.mp3"));
        assert_eq!(
            strings(&args),
            vec!["-y", "-i", "/t/in.webm", "-vn", "-acodec", "libmp3lame", "-b:a", "320k", "/t/out.mp3"]
        );
    }

    #[test]
    fn test_embed_cover_args() {
        let args = embed_cover_args(Path::new("a.mp3"), Path::new("c.jpg"), Path::new("o.mp3"));
        let args = strings(&args);
        assert_eq!(&args[..5], &["-y", "-i", "a.mp3", "-i", "c.jpg"]);
        assert!(args.windows(2).any(|w| w == ["-id3v2_version", "3"]));
        assert!(args.contains(&"title=Album cover".to_string()));
        assert!(args.contains(&"comment=Cover (front)".to_string()));
        assert_eq!(args.last().unwrap(), "o.mp3");
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = transcode_to_mp3(&tools("ffmpeg"), &dir.path().join("nope.webm"), &dir.path().join("o.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::InputNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_binary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.webm");
        std::fs::write(&input, b"x").unwrap();
        let err = transcode_to_mp3(&tools("/nonexistent/ffmpeg"), &input, &dir.path().join("o.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::IoError(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ffmpeg_success_without_output_fails() {
        // `true` exits 0 without writing anything
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.webm");
        std::fs::write(&input, b"x").unwrap();
        let err = transcode_to_mp3(&tools("true"), &input, &dir.path().join("o.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::OutputFailed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ffmpeg_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mp3 = dir.path().join("a.mp3");
        let cover = dir.path().join("c.jpg");
        std::fs::write(&mp3, b"x").unwrap();
        std::fs::write(&cover, b"x").unwrap();
        let err = embed_cover(&tools("false"), &mp3, &cover, &dir.path().join("o.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::FfmpegError(_)));
    }
}

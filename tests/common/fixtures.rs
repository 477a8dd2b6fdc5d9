//! Fake `yt-dlp` / `ffmpeg` executables.
//!
//! Each fake is a small POSIX shell script written into the test's scratch
//! directory. The behavior is baked into the script so tests running in
//! parallel never share state.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Title printed by every fake yt-dlp for `--print %(title)s`
pub const FAKE_TITLE: &str = "Fake Title: Test!";

/// Minimal JPEG header, enough for magic-byte detection
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

#[derive(Debug, Clone)]
pub enum YtDlpBehavior {
    /// Writes `RAW:<path>` to the `-o` template (extension `webm`), or
    /// `FAKEMP4DATA` to stdout for `-o -`
    Succeed,
    /// Prints the "format not available" error and exits 1
    FormatUnavailable,
    /// Title lookup fails
    TitleFails,
    /// Writes its PID to the given file, emits one chunk, then sleeps
    StreamThenHang { pid_file: PathBuf },
    /// Leaves a `.part` fragment next to the `-o` target, writes its PID,
    /// then sleeps
    PartThenHang { pid_file: PathBuf },
}

#[derive(Debug, Clone)]
pub enum FfmpegBehavior {
    /// Transcode copies input to output; cover appends `:COVER`
    Succeed,
    /// Transcode succeeds, cover embedding exits 1
    CoverFails,
    /// Transcode exits 1
    TranscodeFails,
    /// Transcode writes a partial output, its PID, then sleeps
    TranscodeHangs { pid_file: PathBuf },
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("write fake tool");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake tool");
    path
}

/// Writes a fake yt-dlp. Every invocation touches `<dir>/ytdlp.invoked`.
pub fn fake_ytdlp(dir: &Path, behavior: YtDlpBehavior) -> PathBuf {
    let marker = dir.join("ytdlp.invoked");
    let action = match &behavior {
        YtDlpBehavior::Succeed => r#"
if [ "$out" = "-" ]; then
  printf 'FAKEMP4DATA'
else
  target=$(printf '%s' "$out" | sed 's/%(ext)s/webm/')
  printf 'RAW:%s' "$target" > "$target"
fi
exit 0
"#
        .to_string(),
        YtDlpBehavior::FormatUnavailable => r#"
echo "ERROR: [youtube] dQw4w9WgXcQ: Requested format is not available. Use --list-formats for a list of available formats" >&2
exit 1
"#
        .to_string(),
        YtDlpBehavior::TitleFails => String::new(),
        YtDlpBehavior::StreamThenHang { pid_file } => format!(
            r#"
echo $$ > "{}"
printf 'FIRSTCHUNK'
exec sleep 30
"#,
            pid_file.display()
        ),
        YtDlpBehavior::PartThenHang { pid_file } => format!(
            r#"
target=$(printf '%s' "$out" | sed 's/%(ext)s/webm/')
printf 'PARTIAL' > "$target.part"
echo $$ > "{pid}.tmp" && mv "{pid}.tmp" "{pid}"
exec sleep 30
"#,
            pid = pid_file.display()
        ),
    };

    let title = match behavior {
        YtDlpBehavior::TitleFails => r#"echo "ERROR: Video unavailable" >&2; exit 1"#.to_string(),
        _ => format!("echo \"{}\"; exit 0", FAKE_TITLE),
    };

    let body = format!(
        r#"touch "{marker}"
out=""
print=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --print) print="$2"; shift 2 ;;
    *) shift ;;
  esac
done
if [ -n "$print" ]; then
  {title}
fi
{action}"#,
        marker = marker.display(),
        title = title,
        action = action,
    );
    write_script(dir, "yt-dlp", &body)
}

/// Writes a fake ffmpeg. Two `-i` inputs mean the cover step.
pub fn fake_ffmpeg(dir: &Path, behavior: FfmpegBehavior) -> PathBuf {
    let cover_ok = r#"{ cat "$in"; printf ':COVER'; } > "$last""#.to_string();
    let (transcode, cover) = match behavior {
        FfmpegBehavior::Succeed => (r#"cp "$in" "$last""#.to_string(), cover_ok),
        FfmpegBehavior::CoverFails => (
            r#"cp "$in" "$last""#.to_string(),
            r#"echo "Invalid data found" >&2; exit 1"#.to_string(),
        ),
        FfmpegBehavior::TranscodeFails => (
            r#"echo "Invalid data found" >&2; exit 1"#.to_string(),
            "exit 1".to_string(),
        ),
        FfmpegBehavior::TranscodeHangs { pid_file } => (
            format!(
                r#"printf 'PARTIAL' > "$last"; echo $$ > "{pid}.tmp" && mv "{pid}.tmp" "{pid}"; exec sleep 30"#,
                pid = pid_file.display()
            ),
            cover_ok,
        ),
    };

    let body = format!(
        r#"in=""
prev=""
inputs=0
for a in "$@"; do
  if [ "$prev" = "-i" ]; then
    inputs=$((inputs + 1))
    if [ -z "$in" ]; then in="$a"; fi
  fi
  prev="$a"
done
for last; do :; done
if [ "$inputs" -ge 2 ]; then
  {cover}
else
  {transcode}
fi
"#
    );
    write_script(dir, "ffmpeg", &body)
}

//! Request-scoped temporary files.
//!
//! Every path handed out by a [`TempWorkspace`] embeds the video id and a
//! per-request token, so concurrent requests for the same video never share
//! a file. A [`TempArtifact`] deletes its file when dropped: ownership ties
//! each file to the request that created it, on every exit path.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::core::validation::VideoId;

/// Role of an intermediate file, used as the filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactRole {
    Raw,
    Transcoded,
    Thumbnail,
    WithCover,
}

impl ArtifactRole {
    fn suffix(&self) -> &'static str {
        match self {
            ArtifactRole::Raw => "raw",
            ArtifactRole::Transcoded => "320k",
            ArtifactRole::Thumbnail => "thumb",
            ArtifactRole::WithCover => "cover",
        }
    }
}

/// Naming scope for one request's temporary files.
#[derive(Debug, Clone)]
pub struct TempWorkspace {
    dir: PathBuf,
    video_id: VideoId,
    token: String,
}

/// Draws a fresh request token (UUID v4, simple form).
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

impl TempWorkspace {
    /// Creates the temp directory if needed.
    pub async fn create(dir: &Path, video_id: &VideoId, token: &str) -> std::io::Result<Self> {
        fs_err::tokio::create_dir_all(dir).await?;
        Ok(Self {
            dir: dir.to_path_buf(),
            video_id: video_id.clone(),
            token: token.to_string(),
        })
    }

    /// Request token, also used to tag log lines.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<id>_<token>_<role>.` prefix shared by every file of a given role.
    pub fn file_prefix(&self, role: ArtifactRole) -> String {
        format!("{}_{}_{}.", self.video_id, self.token, role.suffix())
    }

    /// Full path for a role with a known extension.
    pub fn path_for(&self, role: ArtifactRole, extension: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.file_prefix(role), extension))
    }

    /// yt-dlp output template; yt-dlp fills in the real extension.
    pub fn output_template(&self, role: ArtifactRole) -> PathBuf {
        self.dir.join(format!("{}%(ext)s", self.file_prefix(role)))
    }

    /// Finds the file yt-dlp produced for `role`, whatever its extension.
    ///
    /// Leftover `.part` / `.ytdl` fragments are ignored.
    pub async fn find_produced(&self, role: ArtifactRole) -> std::io::Result<Option<PathBuf>> {
        let prefix = self.file_prefix(role);
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl") {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    /// Removes every file carrying this request's token.
    ///
    /// Used after a failed or cancelled yt-dlp run, which can leave
    /// fragments that no [`TempArtifact`] owns yet. Synchronous so it can run
    /// from `Drop`.
    pub fn purge(&self) {
        let marker = format!("{}_{}_", self.video_id, self.token);
        let Ok(entries) = fs_err::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(&marker) {
                match fs_err::remove_file(entry.path()) {
                    Ok(()) => log::debug!("[{}] Purged {}", self.token, entry.path().display()),
                    Err(e) => log::warn!("[{}] Failed to purge temp file: {}", self.token, e),
                }
            }
        }
    }
}

/// Purges the workspace when dropped, unless disarmed.
pub struct PurgeGuard<'a> {
    workspace: &'a TempWorkspace,
    armed: bool,
}

impl<'a> PurgeGuard<'a> {
    pub fn new(workspace: &'a TempWorkspace) -> Self {
        Self { workspace, armed: true }
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PurgeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.workspace.purge();
        }
    }
}

/// A temporary file owned by exactly one request, deleted on drop.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    /// Takes ownership of an existing (or about to be created) file.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes.
    pub async fn size(&self) -> std::io::Result<u64> {
        Ok(fs_err::tokio::metadata(&self.path).await?.len())
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match fs_err::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed temp file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove temp file: {}", e),
        }
    }
}

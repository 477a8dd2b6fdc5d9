//! Download management and processing

pub mod audio;
pub mod metadata;
pub mod pipeline;
pub mod request;
pub mod send;
pub mod temp;
pub mod thumbnail;
pub mod video;
pub mod ytdlp_errors;

// Re-exports for convenience
pub use pipeline::{handle_download, AudioOutcome, RequestPhase, RequestTrace};
pub use request::{DownloadParams, DownloadRequest, MediaType, Quality};
pub use send::StreamHandle;
pub use temp::{TempArtifact, TempWorkspace};

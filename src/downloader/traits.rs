// Collaborator traits: the remote provider and the local filesystem

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use tokio::io::AsyncWrite;

use super::errors::DownloadError;

/// Raw response body with its HTTP status
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ProviderResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Streamed media body
pub type MediaStream = BoxStream<'static, Result<Bytes, DownloadError>>;

/// Media response: status first, body pulled chunk by chunk
pub struct MediaResponse {
    pub status: u16,
    pub body: MediaStream,
}

impl MediaResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Remote source of video info, playlist pages, and media bytes.
///
/// Implementations only report what happened on the wire: a transport
/// failure is `Err(DownloadError::Transport)`, any HTTP answer is `Ok`
/// with its status. Status handling and parsing are up to the caller.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name of the provider (for logging)
    fn name(&self) -> &'static str;

    /// Raw, query-encoded video info for one id
    async fn fetch_video_metadata(&self, id: &str) -> Result<ProviderResponse, DownloadError>;

    /// Playlist page markup
    async fn fetch_playlist_markup(&self, url: &str) -> Result<ProviderResponse, DownloadError>;

    /// Start a media transfer
    async fn fetch_media(&self, url: &str) -> Result<MediaResponse, DownloadError>;
}

/// Writable file handle
pub type FileHandle = Box<dyn AsyncWrite + Send + Unpin>;

/// Local storage used by the executor and the orchestrator
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Create the directory and its parents if missing
    async fn ensure_directory(&self, path: &Path) -> Result<(), DownloadError>;

    /// Make a file name safe to join onto a trusted directory
    fn sanitize_file_name(&self, candidate: &str) -> String;

    /// Create a new file for writing; fails if it already exists
    async fn create_file(&self, path: &Path) -> Result<FileHandle, DownloadError>;

    /// Move a finished file into its final place
    async fn persist(&self, from: &Path, to: &Path) -> Result<(), DownloadError>;

    /// Best-effort removal of a partial file
    async fn discard(&self, path: &Path);

    /// Sanitized `dir/name`
    fn sanitize_path(&self, dir: &Path, candidate: &str) -> PathBuf {
        dir.join(self.sanitize_file_name(candidate))
    }
}

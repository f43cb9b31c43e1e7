// Metadata resolver - provider responses -> typed video info and playlists
//
// Strategy:
// 1. Ask the provider for raw bytes
// 2. Reject non-2xx answers with HttpStatus
// 3. Hand the body to the pure parsers; skipped records are logged there
//
// No retries at this layer.

use std::sync::Arc;

use tracing::{debug, info};

use super::playlist::parse_playlist;
use super::video_info::{parse_video_info, VideoMetadata};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::Playlist;
use crate::downloader::traits::Provider;

/// Resolves ids and playlist URLs through a provider
#[derive(Clone)]
pub struct MetadataResolver {
    provider: Arc<dyn Provider>,
}

impl MetadataResolver {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Fetch and parse the stream list for one video
    pub async fn resolve_video(&self, id: &str) -> Result<VideoMetadata, DownloadError> {
        debug!(provider = self.provider.name(), id, "Fetching video info");

        let response = self.provider.fetch_video_metadata(id).await?;
        if !response.is_success() {
            return Err(DownloadError::HttpStatus(response.status));
        }

        let parsed = parse_video_info(&response.body)?;
        if !parsed.skipped.is_empty() {
            debug!(
                id,
                skipped = parsed.skipped.len(),
                kept = parsed.value.streams.len(),
                "Some stream records were malformed"
            );
        }
        debug!(id, streams = parsed.value.streams.len(), "Video info parsed");

        Ok(parsed.into_value())
    }

    /// Fetch and parse a playlist page
    pub async fn resolve_playlist(&self, url: &str) -> Result<Playlist, DownloadError> {
        info!(provider = self.provider.name(), url, "Fetching playlist");

        let response = self.provider.fetch_playlist_markup(url).await?;
        if !response.is_success() {
            return Err(DownloadError::HttpStatus(response.status));
        }

        let markup = String::from_utf8_lossy(&response.body);
        let parsed = parse_playlist(&markup);
        if !parsed.skipped.is_empty() {
            debug!(
                url,
                skipped = parsed.skipped.len(),
                "Some playlist links could not be parsed"
            );
        }
        info!(
            title = %parsed.value.title,
            videos = parsed.value.videos.len(),
            "Playlist resolved"
        );

        Ok(parsed.into_value())
    }
}

// Scripted provider for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::sync::Notify;

use super::errors::DownloadError;
use super::traits::{MediaResponse, MediaStream, Provider, ProviderResponse};

#[derive(Clone)]
enum Reply {
    Body(u16, Bytes),
    TransportError(String),
}

impl Reply {
    fn respond(&self) -> Result<ProviderResponse, DownloadError> {
        match self {
            Self::Body(status, body) => Ok(ProviderResponse::new(*status, body.clone())),
            Self::TransportError(msg) => Err(DownloadError::Transport(msg.clone())),
        }
    }
}

/// What a media URL does when fetched
#[derive(Clone)]
pub enum MediaScript {
    /// 200 with these chunks
    Chunks(Vec<Vec<u8>>),
    /// 200, then the body waits for the notify before yielding
    Gated(Vec<u8>, Arc<Notify>),
    /// 200, one chunk, then the connection drops
    BrokenBody(Vec<u8>, String),
    Status(u16),
    TransportError(String),
}

impl MediaScript {
    /// Gated body plus the handle that releases it
    pub fn gated(body: Vec<u8>) -> (Self, Arc<Notify>) {
        let notify = Arc::new(Notify::new());
        (Self::Gated(body, Arc::clone(&notify)), notify)
    }

    fn respond(&self) -> Result<MediaResponse, DownloadError> {
        let body: MediaStream = match self.clone() {
            Self::Chunks(chunks) => {
                stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c)))).boxed()
            }
            Self::Gated(data, notify) => stream::once(async move {
                notify.notified().await;
                Ok(Bytes::from(data))
            })
            .boxed(),
            Self::BrokenBody(data, msg) => stream::iter(vec![
                Ok(Bytes::from(data)),
                Err(DownloadError::Transport(msg)),
            ])
            .boxed(),
            Self::Status(status) => {
                return Ok(MediaResponse {
                    status,
                    body: stream::empty().boxed(),
                })
            }
            Self::TransportError(msg) => return Err(DownloadError::Transport(msg)),
        };
        Ok(MediaResponse { status: 200, body })
    }
}

/// In-memory provider. Unknown ids and URLs answer 404.
#[derive(Default)]
pub struct MockProvider {
    videos: HashMap<String, Reply>,
    playlists: HashMap<String, Reply>,
    media: HashMap<String, MediaScript>,
    metadata_calls: AtomicUsize,
    media_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, id: &str, body: impl Into<String>) -> Self {
        self.videos
            .insert(id.to_string(), Reply::Body(200, Bytes::from(body.into())));
        self
    }

    pub fn with_video_status(mut self, id: &str, status: u16) -> Self {
        self.videos
            .insert(id.to_string(), Reply::Body(status, Bytes::new()));
        self
    }

    pub fn with_video_transport_error(mut self, id: &str, msg: &str) -> Self {
        self.videos
            .insert(id.to_string(), Reply::TransportError(msg.to_string()));
        self
    }

    pub fn with_playlist(mut self, url: &str, markup: impl Into<String>) -> Self {
        self.playlists
            .insert(url.to_string(), Reply::Body(200, Bytes::from(markup.into())));
        self
    }

    pub fn with_playlist_status(mut self, url: &str, status: u16) -> Self {
        self.playlists
            .insert(url.to_string(), Reply::Body(status, Bytes::new()));
        self
    }

    pub fn with_media(mut self, url: &str, script: MediaScript) -> Self {
        self.media.insert(url.to_string(), script);
        self
    }

    /// Video info requests made so far
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    /// Media transfers started so far
    pub fn media_calls(&self) -> usize {
        self.media_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_video_metadata(&self, id: &str) -> Result<ProviderResponse, DownloadError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        match self.videos.get(id) {
            Some(reply) => reply.respond(),
            None => Ok(ProviderResponse::new(404, Bytes::new())),
        }
    }

    async fn fetch_playlist_markup(&self, url: &str) -> Result<ProviderResponse, DownloadError> {
        match self.playlists.get(url) {
            Some(reply) => reply.respond(),
            None => Ok(ProviderResponse::new(404, Bytes::new())),
        }
    }

    async fn fetch_media(&self, url: &str) -> Result<MediaResponse, DownloadError> {
        self.media_calls.fetch_add(1, Ordering::SeqCst);
        match self.media.get(url) {
            Some(script) => script.respond(),
            None => MediaScript::Status(404).respond(),
        }
    }
}

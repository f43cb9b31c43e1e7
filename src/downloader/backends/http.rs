// HTTP provider - talks to the video host over reqwest
//
// Reports what happened on the wire and nothing more: connection problems
// become Transport errors, every HTTP answer is returned with its status.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, Proxy};
use tracing::debug;
use url::form_urlencoded;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::NetworkConfig;
use crate::downloader::traits::{MediaResponse, Provider, ProviderResponse};

pub const DEFAULT_VIDEO_INFO_URL: &str = "http://youtube.com/get_video_info?video_id=";

/// Provider endpoints
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Prefix the url-encoded video id is appended to
    pub video_info_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            video_info_url: DEFAULT_VIDEO_INFO_URL.to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn with_video_info_url(mut self, url: impl Into<String>) -> Self {
        self.video_info_url = url.into();
        self
    }

    fn video_info_endpoint(&self, id: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(id.as_bytes()).collect();
        format!("{}{}", self.video_info_url, encoded)
    }
}

pub struct HttpProvider {
    client: Client,
    config: ProviderConfig,
    /// Applies to metadata and playlist requests; media transfers only get
    /// the connect timeout
    request_timeout: Option<Duration>,
}

impl HttpProvider {
    pub fn new(network: &NetworkConfig, config: ProviderConfig) -> Result<Self, DownloadError> {
        Ok(Self {
            client: build_client(network)?,
            config,
            request_timeout: network.timeout.map(|s| Duration::from_secs(u64::from(s))),
        })
    }

    async fn get_body(&self, url: &str) -> Result<ProviderResponse, DownloadError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;
        debug!(url, status, bytes = body.len(), "Provider response");

        Ok(ProviderResponse::new(status, body))
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_video_metadata(&self, id: &str) -> Result<ProviderResponse, DownloadError> {
        self.get_body(&self.config.video_info_endpoint(id)).await
    }

    async fn fetch_playlist_markup(&self, url: &str) -> Result<ProviderResponse, DownloadError> {
        self.get_body(url).await
    }

    async fn fetch_media(&self, url: &str) -> Result<MediaResponse, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        debug!(status, length = ?response.content_length(), "Media response");

        Ok(MediaResponse {
            status,
            body: response.bytes_stream().map_err(transport_error).boxed(),
        })
    }
}

/// Build the shared client from the network settings
pub fn build_client(network: &NetworkConfig) -> Result<Client, DownloadError> {
    let mut builder = Client::builder();

    if let Some(proxy_url) = network.proxy.as_deref().filter(|p| !p.is_empty()) {
        let proxy = Proxy::all(proxy_url).map_err(|e| {
            DownloadError::InvalidConfig(format!("invalid proxy '{}': {}", proxy_url, e))
        })?;
        debug!(proxy = proxy_url, "Using proxy");
        builder = builder.proxy(proxy);
    }

    if let Some(seconds) = network.timeout {
        builder = builder.connect_timeout(Duration::from_secs(u64::from(seconds)));
    }

    if let Some(agent) = network.user_agent.as_deref() {
        builder = builder.user_agent(agent);
    }

    builder
        .build()
        .map_err(|e| DownloadError::InvalidConfig(format!("HTTP client: {}", e)))
}

/// reqwest error plus its source chain, so "timed out" and friends survive
fn transport_error(e: reqwest::Error) -> DownloadError {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    if e.is_timeout() && !message.to_lowercase().contains("timed out") {
        message.push_str(" (timed out)");
    }
    DownloadError::Transport(message)
}

// Common data models for the downloader

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

use super::errors::DownloadError;
use super::extractors::BlockingReason;
use super::quality::QualityPreference;

/// Default ceiling on simultaneous transfers
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// One video to fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoItem {
    /// Provider's opaque video id
    pub id: String,
    /// Human-readable title, used for the output filename
    pub title: String,
}

impl VideoItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// Video with only an id, e.g. from a direct `watch?v=` URL
    pub fn untitled(id: impl Into<String>) -> Self {
        Self::new(id, String::new())
    }
}

impl fmt::Display for VideoItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.title.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.title, self.id)
        }
    }
}

/// Ordered videos of a playlist page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Playlist {
    pub title: String,
    pub videos: Vec<VideoItem>,
}

/// Download options for one run
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub quality: QualityPreference,
    pub output_path: PathBuf,
    /// How many transfers may run at once
    pub max_concurrent: usize,
    pub network: NetworkConfig,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            quality: QualityPreference::NoPreference,
            output_path: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            network: NetworkConfig::default(),
        }
    }
}

impl DownloadOptions {
    pub fn with_quality(mut self, quality: QualityPreference) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.max_concurrent == 0 {
            return Err(DownloadError::InvalidConfig(
                "max concurrent downloads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Network configuration for the HTTP provider
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Timeout in seconds for metadata requests and connection setup
    pub timeout: Option<u32>,

    /// User-Agent header sent with every request
    pub user_agent: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(30),
            user_agent: None,
        }
    }
}

/// Where an item's pipeline was when it finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Resolving,
    Selecting,
    Downloading,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolving => write!(f, "resolving"),
            Self::Selecting => write!(f, "selecting"),
            Self::Downloading => write!(f, "downloading"),
        }
    }
}

/// Terminal state of one pipeline
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeResult {
    Success {
        path: PathBuf,
    },
    Failure {
        stage: PipelineStage,
        #[serde(serialize_with = "serialize_error")]
        error: DownloadError,
        hint: Option<BlockingReason>,
    },
}

fn serialize_error<S: Serializer>(error: &DownloadError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Result of one item's pipeline
#[derive(Debug, Serialize)]
pub struct DownloadOutcome {
    pub item: VideoItem,
    #[serde(flatten)]
    pub result: OutcomeResult,
}

impl DownloadOutcome {
    pub fn success(item: VideoItem, path: PathBuf) -> Self {
        Self {
            item,
            result: OutcomeResult::Success { path },
        }
    }

    pub fn failure(
        item: VideoItem,
        stage: PipelineStage,
        error: DownloadError,
        hint: Option<BlockingReason>,
    ) -> Self {
        Self {
            item,
            result: OutcomeResult::Failure { stage, error, hint },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, OutcomeResult::Success { .. })
    }

    pub fn error(&self) -> Option<&DownloadError> {
        match &self.result {
            OutcomeResult::Failure { error, .. } => Some(error),
            OutcomeResult::Success { .. } => None,
        }
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            OutcomeResult::Success { path } => {
                write!(f, "✓ {} -> {}", self.item, path.display())
            }
            OutcomeResult::Failure { stage, error, hint } => {
                write!(f, "✗ {} failed while {}: {}", self.item, stage, error)?;
                if let Some(hint) = hint {
                    write!(f, " [{}", hint)?;
                    if hint.proxy_might_help() {
                        write!(f, "; a proxy may help")?;
                    } else if hint.is_permanent() {
                        write!(f, "; retrying won't help")?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Directory the files were written to
    pub destination: PathBuf,
    /// One entry per item, in playlist order
    pub outcomes: Vec<DownloadOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

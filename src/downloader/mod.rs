// Downloader module - resolve -> select -> download pipeline
//
// - quality / format_selector: the quality ladder and variant selection
// - extractors: provider responses -> typed metadata
// - executor: one variant -> one file on disk
// - gate / orchestrator: bounded fan-out over a whole playlist
// - backends: the real HTTP provider

pub mod backends;
pub mod errors;
pub mod executor;
pub mod extractors;
pub mod format_selector;
pub mod fs;
pub mod gate;
pub mod models;
pub mod orchestrator;
pub mod quality;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use backends::{HttpProvider, ProviderConfig};
pub use errors::DownloadError;
pub use executor::DownloadExecutor;
pub use extractors::{parse_video_id, BlockingReason, MetadataResolver, Target};
pub use format_selector::{StreamSet, StreamVariant};
pub use fs::LocalFilesystem;
pub use gate::{AdmissionGate, GatePermit};
pub use models::{
    DownloadOptions, DownloadOutcome, NetworkConfig, PipelineStage, Playlist, RunReport,
    VideoItem,
};
pub use orchestrator::Downloader;
pub use quality::{Quality, QualityPreference};
pub use traits::{Filesystem, Provider};

// Metadata extraction - provider responses -> typed data
//
// - links: video id extraction, video vs playlist targets
// - video_info: query-encoded stream metadata -> StreamSet
// - playlist: playlist page markup -> ordered VideoItems
// - diagnostics: skipped-record reporting, failure classification
// - resolver: ties the parsers to a Provider
//
// Parsers are pure; a bad record or link is skipped and reported, never fatal.

mod diagnostics;
mod links;
pub(crate) mod playlist;
mod resolver;
pub(crate) mod video_info;

pub use diagnostics::{diagnose, diagnose_text, BlockingReason, Parsed, SkipReason, Skipped};
pub use links::{parse_video_id, Target, PROVIDER_BASE_URL};
pub use playlist::parse_playlist;
pub use resolver::MetadataResolver;
pub use video_info::{parse_video_info, VideoMetadata};

// Provider backends

pub mod http;

pub use http::{build_client, HttpProvider, ProviderConfig, DEFAULT_VIDEO_INFO_URL};

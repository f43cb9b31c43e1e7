pub mod downloader;
pub mod logging;

pub use downloader::{DownloadError, DownloadOptions, Downloader, RunReport, Target};

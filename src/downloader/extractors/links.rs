// Link handling - video id extraction and target classification

use lazy_static::lazy_static;
use url::Url;

use crate::downloader::errors::DownloadError;

/// Base that relative links (e.g. playlist hrefs) are resolved against
pub const PROVIDER_BASE_URL: &str = "https://www.youtube.com/";

const VIDEO_PARAM: &str = "v";
const LIST_PARAM: &str = "list";

lazy_static! {
    static ref BASE_URL: Url = Url::parse(PROVIDER_BASE_URL).unwrap();
}

/// Parse an absolute or relative URL against the provider base
fn parse_url(input: &str) -> Result<Url, DownloadError> {
    Url::options()
        .base_url(Some(&BASE_URL))
        .parse(input.trim())
        .map_err(|e| DownloadError::InvalidUrl {
            url: input.to_string(),
            reason: e.to_string(),
        })
}

fn first_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Extract the first `v` query value from a watch URL.
///
/// Accepts relative links such as `/watch?v=oFE3tp5esLw&index=6`.
pub fn parse_video_id(input: &str) -> Result<String, DownloadError> {
    let url = parse_url(input)?;
    match first_param(&url, VIDEO_PARAM) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(DownloadError::MissingVideoParam(input.to_string())),
    }
}

/// What the user pointed us at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A single video
    Video { id: String },
    /// A playlist page to scrape
    Playlist { url: String },
}

impl Target {
    /// Classify a URL. `/playlist` pages and list-only links are playlists;
    /// everything else must carry a video id.
    pub fn parse(input: &str) -> Result<Self, DownloadError> {
        let url = parse_url(input)?;
        let is_playlist_page = url.path().trim_end_matches('/').ends_with("/playlist");
        let video = first_param(&url, VIDEO_PARAM).filter(|id| !id.is_empty());
        let list = first_param(&url, LIST_PARAM).filter(|id| !id.is_empty());

        match (is_playlist_page, video, list) {
            (true, _, _) | (false, None, Some(_)) => Ok(Self::Playlist {
                url: url.to_string(),
            }),
            (false, Some(id), _) => Ok(Self::Video { id }),
            (false, None, None) => Err(DownloadError::MissingVideoParam(input.to_string())),
        }
    }
}

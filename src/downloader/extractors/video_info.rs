// Video info parsing - query-encoded provider response -> StreamSet
//
// Response layout:
//   status=ok&title=...&url_encoded_fmt_stream_map=<rec>,<rec>,...
// where each record is itself query-encoded with `quality`, `type`, `url`.
// A bad record is skipped; it never fails the whole response.

use std::collections::HashMap;

use url::form_urlencoded;

use super::diagnostics::{Parsed, SkipReason};
use crate::downloader::errors::DownloadError;
use crate::downloader::format_selector::{StreamSet, StreamVariant};
use crate::downloader::quality::Quality;

const STATUS_FIELD: &str = "status";
const STATUS_OK: &str = "ok";
const REASON_FIELD: &str = "reason";
const TITLE_FIELD: &str = "title";
const STREAM_MAP_FIELD: &str = "url_encoded_fmt_stream_map";
const RECORD_SEPARATOR: char = ',';

const QUALITY_FIELD: &str = "quality";
const TYPE_FIELD: &str = "type";
const URL_FIELD: &str = "url";

/// Parsed video info
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoMetadata {
    /// Title reported by the provider, if any
    pub title: Option<String>,
    pub streams: StreamSet,
}

/// First value per key, like a query map lookup
fn first_values(input: &[u8]) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for (key, value) in form_urlencoded::parse(input) {
        fields
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    fields
}

/// Parse a video info response body.
///
/// Fails only when the provider reports a non-ok status; malformed stream
/// records are reported in `skipped`.
pub fn parse_video_info(body: &[u8]) -> Result<Parsed<VideoMetadata>, DownloadError> {
    let fields = first_values(body);

    if fields.get(STATUS_FIELD).map(String::as_str) != Some(STATUS_OK) {
        return Err(DownloadError::Provider {
            reason: fields.get(REASON_FIELD).cloned(),
        });
    }

    let mut parsed = Parsed::new(VideoMetadata {
        title: fields
            .get(TITLE_FIELD)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        streams: StreamSet::new(),
    });

    let stream_map = fields.get(STREAM_MAP_FIELD).map(String::as_str).unwrap_or("");
    if stream_map.is_empty() {
        return Ok(parsed);
    }

    for (index, record) in stream_map.split(RECORD_SEPARATOR).enumerate() {
        match parse_stream_record(record) {
            Ok(variant) => parsed.value.streams.push(variant),
            Err(reason) => parsed.skip(index, reason),
        }
    }

    Ok(parsed)
}

/// Parse one `quality=..&type=..&url=..` record
fn parse_stream_record(record: &str) -> Result<StreamVariant, SkipReason> {
    let fields = first_values(record.as_bytes());
    let field = |name: &'static str| {
        fields
            .get(name)
            .map(String::as_str)
            .ok_or(SkipReason::MissingField(name))
    };

    let quality_name = field(QUALITY_FIELD)?;
    let mime_format = field(TYPE_FIELD)?;
    let url = field(URL_FIELD)?;

    let quality = Quality::from_name(quality_name)
        .ok_or_else(|| SkipReason::UnknownQuality(quality_name.to_string()))?;

    StreamVariant::new(quality, url, mime_format)
}

// Playlist page parsing - markup -> Playlist
//
// Looks for two element classes:
// - `pl-header-title`: the playlist title
// - `pl-video-title-link`: one anchor per video, text = title, href = watch URL
// Links whose href yields no video id are skipped, not fatal.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::diagnostics::{Parsed, SkipReason};
use super::links::parse_video_id;
use crate::downloader::models::{Playlist, VideoItem};

pub const PLAYLIST_TITLE_CLASS: &str = "pl-header-title";
pub const VIDEO_TITLE_CLASS: &str = "pl-video-title-link";

lazy_static! {
    static ref OPEN_TAG_RE: Regex = Regex::new(r"<([a-zA-Z][a-zA-Z0-9]*)\b([^>]*)>").unwrap();
    static ref CLASS_ATTR_RE: Regex =
        Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref HREF_ATTR_RE: Regex =
        Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref ANY_TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref ENTITY_RE: Regex = Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap();
}

/// One element matched by class
struct Element<'a> {
    attrs: &'a str,
    inner: &'a str,
}

impl Element<'_> {
    fn attr(&self, re: &Regex) -> Option<String> {
        re.captures(self.attrs)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| decode_entities(m.as_str()))
    }

    fn text(&self) -> String {
        let stripped = ANY_TAG_RE.replace_all(self.inner, " ");
        decode_entities(&stripped)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// All elements whose class list contains `class`, in document order
fn elements_with_class<'a>(markup: &'a str, class: &str) -> Vec<Element<'a>> {
    // ASCII lowercasing keeps byte offsets, so indexes carry over to `markup`
    let lower = markup.to_ascii_lowercase();
    let mut found = Vec::new();

    for caps in OPEN_TAG_RE.captures_iter(markup) {
        let (Some(whole), Some(tag), Some(attrs)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };

        let has_class = CLASS_ATTR_RE
            .captures(attrs.as_str())
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map_or(false, |list| list.as_str().split_whitespace().any(|c| c == class));
        if !has_class {
            continue;
        }

        let tag = tag.as_str().to_ascii_lowercase();
        let inner = match closing_tag_offset(&lower, whole.end(), &tag) {
            Some(end) => &markup[whole.end()..end],
            None => "",
        };

        found.push(Element {
            attrs: attrs.as_str(),
            inner,
        });
    }

    found
}

/// Offset of the `</tag>` matching an element whose content starts at `from`.
/// Nested elements with the same tag name are skipped over.
fn closing_tag_offset(lower: &str, from: usize, tag: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = from;

    while let Some(rel) = lower[pos..].find('<') {
        let at = pos + rel;
        let rest = &lower[at + 1..];

        if let Some(after) = rest.strip_prefix('/').and_then(|r| r.strip_prefix(tag)) {
            if after.starts_with(|c: char| c == '>' || c.is_ascii_whitespace()) {
                if depth == 0 {
                    return Some(at);
                }
                depth -= 1;
            }
        } else if let Some(after) = rest.strip_prefix(tag) {
            if after.starts_with(|c: char| c == '>' || c == '/' || c.is_ascii_whitespace()) {
                let self_closing = after
                    .split('>')
                    .next()
                    .map_or(false, |open| open.trim_end().ends_with('/'));
                if !self_closing {
                    depth += 1;
                }
            }
        }

        pos = at + 1;
    }

    None
}

/// Decode the handful of HTML entities that show up in titles and hrefs
pub fn decode_entities(input: &str) -> String {
    ENTITY_RE
        .replace_all(input, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Parse a playlist page
pub fn parse_playlist(markup: &str) -> Parsed<Playlist> {
    let title = elements_with_class(markup, PLAYLIST_TITLE_CLASS)
        .first()
        .map(Element::text)
        .unwrap_or_default();

    let mut parsed = Parsed::new(Playlist {
        title,
        videos: Vec::new(),
    });

    for (index, link) in elements_with_class(markup, VIDEO_TITLE_CLASS)
        .iter()
        .enumerate()
    {
        let Some(href) = link.attr(&HREF_ATTR_RE) else {
            parsed.skip(index, SkipReason::MissingHref);
            continue;
        };

        match parse_video_id(&href) {
            Ok(id) => parsed.value.videos.push(VideoItem::new(id, link.text())),
            Err(e) => parsed.skip(
                index,
                SkipReason::BadLink {
                    href,
                    reason: e.to_string(),
                },
            ),
        }
    }

    parsed
}

// FormatSelector - stream variants and quality-based selection
//
// Handles:
// - Variant validation (non-empty url, `type/subtype` mime shape)
// - File extension derivation from the mime type
// - Picking one variant per video: first, max, min, or by tier name
//
// Scans never re-sort: ties always go to the variant seen first.

use serde::Serialize;

use super::errors::DownloadError;
use super::extractors::SkipReason;
use super::quality::{Quality, QualityPreference};

/// One downloadable encoding of a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamVariant {
    quality: Quality,
    url: String,
    mime_format: String,
}

impl StreamVariant {
    /// Build a variant, rejecting an empty url or a mime type without `/`
    pub fn new(
        quality: Quality,
        url: impl Into<String>,
        mime_format: impl Into<String>,
    ) -> Result<Self, SkipReason> {
        let url = url.into();
        let mime_format = mime_format.into();

        if url.trim().is_empty() {
            return Err(SkipReason::EmptyField("url"));
        }
        if extension_of(&mime_format).is_empty() || !mime_format.contains('/') {
            return Err(SkipReason::BadMimeFormat(mime_format));
        }

        Ok(Self {
            quality,
            url,
            mime_format,
        })
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime_format(&self) -> &str {
        &self.mime_format
    }

    /// File extension derived from the mime type (e.g. "mp4")
    pub fn extension(&self) -> &str {
        extension_of(&self.mime_format)
    }
}

/// Subtype of a `type/subtype[; params]` mime string
pub fn extension_of(mime_format: &str) -> &str {
    let subtype = mime_format
        .split_once('/')
        .map_or(mime_format, |(_, rest)| rest);
    subtype
        .split_once(';')
        .map_or(subtype, |(ext, _)| ext)
        .trim()
}

/// Variants available for one video, in provider order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSet {
    variants: Vec<StreamVariant>,
}

impl StreamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, variant: StreamVariant) {
        self.variants.push(variant);
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamVariant> {
        self.variants.iter()
    }

    /// Pick one variant for the given preference
    pub fn select(&self, preference: &QualityPreference) -> Result<&StreamVariant, DownloadError> {
        let first = self.variants.first().ok_or(DownloadError::EmptySet)?;

        match preference {
            // Arbitrary, but stable for a fixed provider order
            QualityPreference::NoPreference => Ok(first),
            QualityPreference::Max => Ok(self.scan(first, |candidate, chosen| candidate > chosen)),
            QualityPreference::Min => Ok(self.scan(first, |candidate, chosen| candidate < chosen)),
            QualityPreference::Named(name) => {
                let quality: Quality = name.parse()?;
                self.find_by_quality(quality)
                    .ok_or(DownloadError::NoMatch(quality))
            }
        }
    }

    /// First variant with exactly this quality
    pub fn find_by_quality(&self, quality: Quality) -> Option<&StreamVariant> {
        self.variants.iter().find(|v| v.quality == quality)
    }

    /// Single pass; a candidate replaces the current choice only if strictly better
    fn scan<'a>(
        &'a self,
        first: &'a StreamVariant,
        better: impl Fn(Quality, Quality) -> bool,
    ) -> &'a StreamVariant {
        self.variants.iter().skip(1).fold(first, |chosen, candidate| {
            if better(candidate.quality, chosen.quality) {
                candidate
            } else {
                chosen
            }
        })
    }
}

impl FromIterator<StreamVariant> for StreamSet {
    fn from_iter<I: IntoIterator<Item = StreamVariant>>(iter: I) -> Self {
        Self {
            variants: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for StreamSet {
    type Item = StreamVariant;
    type IntoIter = std::vec::IntoIter<StreamVariant>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: &str = r#"video/mp4; codecs="avc1.42001E, mp4a.40.2""#;

    fn variant(quality: Quality, url: &str) -> StreamVariant {
        StreamVariant::new(quality, url, FORMAT).unwrap()
    }

    fn gen_streams() -> StreamSet {
        [
            variant(Quality::Small, "https://example.com/small"),
            variant(Quality::Medium, "https://example.com/medium"),
            variant(Quality::Hd720, "https://example.com/hd720"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(r#"video/mp4; codecs="avc1""#), "mp4");
        assert_eq!(extension_of("video/webm"), "webm");
        assert_eq!(extension_of("video/x-flv;"), "x-flv");
    }

    #[test]
    fn test_variant_validation() {
        assert_eq!(
            StreamVariant::new(Quality::Small, "", FORMAT),
            Err(SkipReason::EmptyField("url"))
        );
        assert!(matches!(
            StreamVariant::new(Quality::Small, "https://example.com/", "mp4"),
            Err(SkipReason::BadMimeFormat(_))
        ));
        assert!(matches!(
            StreamVariant::new(Quality::Small, "https://example.com/", "video/; codecs=x"),
            Err(SkipReason::BadMimeFormat(_))
        ));
    }

    #[test]
    fn test_choose_min_stream() {
        let streams = gen_streams();
        let got = streams.select(&QualityPreference::Min).unwrap();
        assert_eq!(got.quality(), Quality::Small);
    }

    #[test]
    fn test_choose_max_stream() {
        let streams = gen_streams();
        let got = streams.select(&QualityPreference::Max).unwrap();
        assert_eq!(got.quality(), Quality::Hd720);
    }

    #[test]
    fn test_choose_stream_by_name() {
        let streams = gen_streams();
        let got = streams.select(&QualityPreference::parse("medium")).unwrap();
        assert_eq!(got.url(), "https://example.com/medium");
    }

    #[test]
    fn test_no_preference_takes_first_in_order() {
        let streams: StreamSet = [
            variant(Quality::Medium, "https://example.com/a"),
            variant(Quality::Hd720, "https://example.com/b"),
            variant(Quality::Tiny, "https://example.com/c"),
        ]
        .into_iter()
        .collect();
        let got = streams.select(&QualityPreference::NoPreference).unwrap();
        assert_eq!(got.url(), "https://example.com/a");
    }

    #[test]
    fn test_ties_go_to_first_encountered() {
        let streams: StreamSet = [
            variant(Quality::Small, "https://example.com/small-1"),
            variant(Quality::Hd720, "https://example.com/hd-1"),
            variant(Quality::Small, "https://example.com/small-2"),
            variant(Quality::Hd720, "https://example.com/hd-2"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            streams.select(&QualityPreference::Max).unwrap().url(),
            "https://example.com/hd-1"
        );
        assert_eq!(
            streams.select(&QualityPreference::Min).unwrap().url(),
            "https://example.com/small-1"
        );
        assert_eq!(
            streams.select(&QualityPreference::parse("hd720")).unwrap().url(),
            "https://example.com/hd-1"
        );
    }

    #[test]
    fn test_max_and_min_dominate_every_variant() {
        let orders: [&[Quality]; 4] = [
            &[Quality::Large, Quality::Tiny, Quality::Highres, Quality::Medium],
            &[Quality::Hd1080],
            &[Quality::Small, Quality::Small, Quality::Small],
            &[Quality::Hd2160, Quality::Hd720, Quality::Hd1440, Quality::Tiny, Quality::Hd2160],
        ];

        for qualities in orders {
            let streams: StreamSet = qualities
                .iter()
                .enumerate()
                .map(|(i, q)| variant(*q, &format!("https://example.com/{}", i)))
                .collect();

            let max = streams.select(&QualityPreference::Max).unwrap();
            let min = streams.select(&QualityPreference::Min).unwrap();
            assert!(streams.iter().all(|v| max.quality() >= v.quality()));
            assert!(streams.iter().all(|v| min.quality() <= v.quality()));
        }
    }

    #[test]
    fn test_empty_set_fails_for_every_preference() {
        let streams = StreamSet::new();
        for preference in [
            QualityPreference::NoPreference,
            QualityPreference::Max,
            QualityPreference::Min,
            QualityPreference::parse("medium"),
            QualityPreference::parse("bogus"),
        ] {
            assert!(matches!(
                streams.select(&preference),
                Err(DownloadError::EmptySet)
            ));
        }
    }

    #[test]
    fn test_absent_quality_is_no_match() {
        let streams = gen_streams();
        for quality in [Quality::Tiny, Quality::Large, Quality::Hd1080, Quality::Highres] {
            let result = streams.select(&QualityPreference::Named(quality.name().to_string()));
            assert!(matches!(result, Err(DownloadError::NoMatch(q)) if q == quality));
        }
    }

    #[test]
    fn test_unrecognized_name_is_unknown_quality() {
        let streams = gen_streams();
        let result = streams.select(&QualityPreference::parse("1080p"));
        assert!(matches!(result, Err(DownloadError::UnknownQuality(name)) if name == "1080p"));
    }

    #[test]
    fn test_selection_is_repeatable() {
        let streams = gen_streams();
        for preference in [
            QualityPreference::NoPreference,
            QualityPreference::Max,
            QualityPreference::Min,
        ] {
            let first = streams.select(&preference).unwrap().clone();
            for _ in 0..5 {
                assert_eq!(streams.select(&preference).unwrap(), &first);
            }
        }
    }
}

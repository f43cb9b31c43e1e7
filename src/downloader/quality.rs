// Quality ladder and the caller's quality preference

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;

/// Stream quality tier, ordered from lowest to highest.
///
/// The order is the declaration order; new tiers slot in between existing
/// ones without changing how the others compare.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Tiny,
    Small,
    Medium,
    Large,
    Hd720,
    Hd1080,
    Hd1440,
    Hd2160,
    Highres,
}

impl Quality {
    /// Every tier, lowest first
    pub const ALL: [Quality; 9] = [
        Self::Tiny,
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::Hd720,
        Self::Hd1080,
        Self::Hd1440,
        Self::Hd2160,
        Self::Highres,
    ];

    /// Name as the provider spells it
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Hd720 => "hd720",
            Self::Hd1080 => "hd1080",
            Self::Hd1440 => "hd1440",
            Self::Hd2160 => "hd2160",
            Self::Highres => "highres",
        }
    }

    /// Look up a tier by provider name. Unknown names are `None`, never a default tier.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.name() == name)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quality {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| DownloadError::UnknownQuality(s.to_string()))
    }
}

/// What the caller asked for. One value per run, read by every pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "name")]
pub enum QualityPreference {
    /// First variant in provider order
    #[default]
    NoPreference,
    Max,
    Min,
    /// Raw quality name; validated when a stream is selected
    Named(String),
}

pub const NO_PREFERENCE: &str = "";
pub const MAX_QUALITY: &str = "max";
pub const MIN_QUALITY: &str = "min";

impl QualityPreference {
    /// Map a flag value onto a preference: `""`, `"max"`, `"min"`, or a tier name.
    pub fn parse(value: &str) -> Self {
        match value {
            NO_PREFERENCE => Self::NoPreference,
            MAX_QUALITY => Self::Max,
            MIN_QUALITY => Self::Min,
            other => Self::Named(other.to_string()),
        }
    }

    /// True when a named preference refers to a tier that doesn't exist
    pub fn is_unknown_name(&self) -> bool {
        matches!(self, Self::Named(name) if Quality::from_name(name).is_none())
    }
}

impl From<&str> for QualityPreference {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for QualityPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPreference => write!(f, "no preference"),
            Self::Max => write!(f, "{}", MAX_QUALITY),
            Self::Min => write!(f, "{}", MIN_QUALITY),
            Self::Named(name) => write!(f, "{}", name),
        }
    }
}

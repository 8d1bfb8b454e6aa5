//! Now-playing metadata model
//!
//! `StreamMetadata` is what `/metadata` serves. It is built once per upstream
//! fetch and never mutated afterwards; the cache hands out clones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::icy::DecodedTitle;

/// Title served when the stream offers no usable title
pub const FALLBACK_TITLE: &str = "Radio Calico";
/// Artist served alongside [`FALLBACK_TITLE`]
pub const FALLBACK_ARTIST: &str = "Live Stream";
/// Title served when a StreamTitle splits into an empty title ("Artist - ")
pub const UNKNOWN_TRACK: &str = "Unknown Track";

/// Now-playing announcement for the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    pub title: String,
    pub artist: String,
    /// Raw StreamTitle value, absent for fallback metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_title: Option<String>,
    /// Milliseconds since the Unix epoch on the wire
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl StreamMetadata {
    /// Station default used when no title can be extracted
    pub fn fallback(timestamp: DateTime<Utc>) -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            artist: FALLBACK_ARTIST.to_string(),
            full_title: None,
            timestamp,
        }
    }

    /// Build from a decoded StreamTitle, substituting [`UNKNOWN_TRACK`] for an empty title
    pub fn from_decoded(decoded: DecodedTitle, timestamp: DateTime<Utc>) -> Self {
        let title = if decoded.title.is_empty() {
            UNKNOWN_TRACK.to_string()
        } else {
            decoded.title
        };

        Self {
            title,
            artist: decoded.artist,
            full_title: Some(decoded.full_title),
            timestamp,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.full_title.is_none() && self.title == FALLBACK_TITLE && self.artist == FALLBACK_ARTIST
    }
}

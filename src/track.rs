//! Request-scoped track records produced by the resolver.
//!
//! Nothing in here is persisted: every record is built fresh for one call
//! and handed to the caller.

use std::{fmt, num::NonZeroU64, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::error::{Error, Result};

/// Catalog track identifier.
///
/// The vendor sends IDs as JSON numbers in most places and as strings in
/// some request and response bodies; both deserialize into this type.
#[serde_as]
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(#[serde_as(as = "PickFirst<(_, DisplayFromStr)>")] NonZeroU64);

impl TrackId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl FromStr for TrackId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim().parse::<u64>()?;
        NonZeroU64::new(id)
            .map(Self)
            .ok_or_else(|| Error::unresolvable_identifier("track id must not be zero"))
    }
}

impl TryFrom<u64> for TrackId {
    type Error = Error;

    fn try_from(id: u64) -> Result<Self> {
        NonZeroU64::new(id)
            .map(Self)
            .ok_or_else(|| Error::unresolvable_identifier("track id must not be zero"))
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fully resolved, playable track.
///
/// `stream_url` is never empty on a successful resolution. The lyric
/// fields are empty strings when the vendor has no lyrics.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolvedTrack {
    pub id: TrackId,
    pub title: String,
    pub cover_url: String,
    /// Artist names joined by `/`.
    pub artist: String,
    pub album: String,
    pub quality_label: String,
    pub size_label: String,
    pub stream_url: String,
    /// Bitrate in bits per second as reported with the stream URL.
    pub bitrate: u64,
    /// Container/codec of the stream, such as `flac` or `mp3`.
    pub encode_type: String,
    pub lyric: String,
    pub translated_lyric: String,
}

/// Display metadata of a single track.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TrackDetail {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: String,
}

impl TrackDetail {
    /// Title used when the vendor omits the song name.
    pub const UNKNOWN_TITLE: &'static str = "Unknown Track";

    /// Album used when the vendor omits the album.
    pub const UNKNOWN_ALBUM: &'static str = "Unknown Album";

    /// Artist and album used by placeholder records.
    pub const PLACEHOLDER_UNKNOWN: &'static str = "unknown";

    /// Synthesizes a record for an ID the vendor has no data for, so
    /// rendering code never has to deal with holes.
    #[must_use]
    pub fn placeholder(id: TrackId) -> Self {
        Self {
            id,
            title: format!("Track {id}"),
            artist: Self::PLACEHOLDER_UNKNOWN.to_owned(),
            album: Self::PLACEHOLDER_UNKNOWN.to_owned(),
            cover_url: String::new(),
        }
    }
}

/// One entry of a playlist listing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PlaylistSummary {
    pub id: u64,
    pub name: String,
    pub cover_url: String,
    pub track_count: u64,
    /// Nickname of the owner, empty when the vendor omits it.
    pub creator: String,
}

/// Original and translated lyrics in LRC format.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Lyrics {
    pub lyric: String,
    pub translated_lyric: String,
}

impl Lyrics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lyric.is_empty() && self.translated_lyric.is_empty()
    }
}

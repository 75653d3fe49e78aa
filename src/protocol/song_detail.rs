//! Song metadata lookup.
//!
//! One request can ask for many songs at once, which is what the batch
//! lookup builds on.
//!
//! # Wire Format
//!
//! Request form field `c`:
//! ```json
//! [{"id": "1", "v": 0}, {"id": "2", "v": 0}]
//! ```
//!
//! Response:
//! ```json
//! {
//!     "code": 200,
//!     "songs": [{
//!         "id": 1,
//!         "name": "Song",
//!         "ar": [{"id": 10, "name": "Artist A"}, {"id": 11, "name": "Artist B"}],
//!         "al": {"id": 20, "name": "Album", "picUrl": "https://p1.music.126.net/..."}
//!     }],
//!     "privileges": [...]
//! }
//! ```
//!
//! Songs the vendor does not know are simply absent from `songs`.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr};

use super::{Endpoint, Status};
use crate::track::{TrackDetail, TrackId};

/// Reference to one song in a detail request.
#[serde_as]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SongRef {
    #[serde_as(as = "DisplayFromStr")]
    pub id: TrackId,
    pub v: u8,
}

impl From<TrackId> for SongRef {
    fn from(id: TrackId) -> Self {
        Self { id, v: 0 }
    }
}

/// Batched detail request, sent as JSON in the `c` form field.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Request(pub Vec<SongRef>);

impl Endpoint for Request {
    const URL: &'static str = "https://interface3.music.163.com/api/v3/song/detail";
}

impl Request {
    /// Name of the form field carrying the request.
    pub const FIELD: &'static str = "c";
}

impl FromIterator<TrackId> for Request {
    fn from_iter<I: IntoIterator<Item = TrackId>>(iter: I) -> Self {
        Self(iter.into_iter().map(SongRef::from).collect())
    }
}

/// Detail response.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Response {
    #[serde(flatten)]
    pub status: Status,

    /// May contain `null` entries for songs that were taken down.
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub songs: Vec<Option<Song>>,
}

impl Response {
    /// Songs that were returned, skipping `null` entries.
    pub fn songs(self) -> impl Iterator<Item = Song> {
        self.songs.into_iter().flatten()
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Song {
    pub id: TrackId,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "ar")]
    #[serde_as(as = "DefaultOnNull")]
    pub artists: Vec<Artist>,

    #[serde(default, rename = "al")]
    pub album: Option<Album>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Artist {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Album {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "picUrl")]
    pub pic_url: Option<String>,
}

impl Song {
    /// Names of all credited artists joined by `/`, skipping blank names.
    #[must_use]
    pub fn artist_names(&self) -> String {
        join_artists(self.artists.iter().map(|artist| artist.name.as_deref()))
    }
}

/// Joins artist names with `/`, skipping missing and blank names.
pub fn join_artists<'a>(names: impl Iterator<Item = Option<&'a str>>) -> String {
    names
        .flatten()
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

impl From<Song> for TrackDetail {
    fn from(song: Song) -> Self {
        let artist = song.artist_names();
        let (album, cover_url) = match song.album {
            Some(album) => (album.name, album.pic_url),
            None => (None, None),
        };

        Self {
            id: song.id,
            title: song
                .name
                .unwrap_or_else(|| TrackDetail::UNKNOWN_TITLE.to_owned()),
            artist,
            album: album.unwrap_or_else(|| TrackDetail::UNKNOWN_ALBUM.to_owned()),
            cover_url: cover_url.unwrap_or_default(),
        }
    }
}

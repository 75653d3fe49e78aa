//! Playlist track listing.
//!
//! Only the ordered track IDs are taken from this endpoint; the display
//! metadata comes from the batched detail lookup.
//!
//! # Wire Format
//!
//! Request: `GET /api/playlist/detail?id=<playlist id>`
//!
//! Response (legacy clients receive `result`, newer ones `playlist`):
//! ```json
//! {
//!     "code": 200,
//!     "result": {
//!         "id": 24381616,
//!         "name": "Playlist",
//!         "trackCount": 3,
//!         "trackIds": [{"id": 1}, {"id": 2}, {"id": 3}],
//!         "tracks": [{"id": 1, "name": "..."}]
//!     }
//! }
//! ```
//!
//! `tracks` can be truncated for long playlists while `trackIds` is
//! complete, so `trackIds` wins when present.

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};

use super::{Endpoint, Status};
use crate::track::TrackId;

/// Playlist request parameters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Request {
    pub id: u64,
}

impl Endpoint for Request {
    const URL: &'static str = "https://music.163.com/api/playlist/detail";
}

impl Request {
    #[must_use]
    pub fn query(&self) -> [(&'static str, String); 1] {
        [("id", self.id.to_string())]
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Response {
    #[serde(flatten)]
    pub status: Status,

    #[serde(default, alias = "playlist")]
    pub result: Option<Playlist>,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Playlist {
    pub id: u64,

    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,

    #[serde(default, rename = "trackIds")]
    #[serde_as(as = "DefaultOnNull")]
    pub track_ids: Vec<Entry>,

    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub tracks: Vec<Entry>,
}

/// Any object with an `id` field; other fields are ignored.
#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Entry {
    pub id: TrackId,
}

impl Playlist {
    /// Track IDs in playlist order.
    #[must_use]
    pub fn track_ids(&self) -> Vec<TrackId> {
        let entries = if self.track_ids.is_empty() {
            &self.tracks
        } else {
            &self.track_ids
        };
        entries.iter().map(|entry| entry.id).collect()
    }
}

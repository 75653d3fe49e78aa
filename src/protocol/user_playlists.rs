//! Playlists created or subscribed by a user.
//!
//! # Wire Format
//!
//! Request: `GET /api/user/playlist/?offset=0&limit=100&uid=<user id>`
//!
//! Response:
//! ```json
//! {
//!     "code": 200,
//!     "more": false,
//!     "playlist": [{
//!         "id": 24381616,
//!         "name": "Liked songs",
//!         "coverImgUrl": "https://p1.music.126.net/...jpg",
//!         "trackCount": 120,
//!         "creator": {"userId": 32953014, "nickname": "someone"}
//!     }]
//! }
//! ```

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};

use super::{Endpoint, Status};
use crate::track::PlaylistSummary;

/// User playlist request parameters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Request {
    pub uid: u64,
}

impl Endpoint for Request {
    const URL: &'static str = "https://music.163.com/api/user/playlist/";
}

impl Request {
    /// Playlists per call. Only the first page is requested.
    pub const LIMIT: u32 = 100;

    /// Query string pairs in wire order.
    #[must_use]
    pub fn query(&self) -> [(&'static str, String); 3] {
        [
            ("offset", "0".to_owned()),
            ("limit", Self::LIMIT.to_string()),
            ("uid", self.uid.to_string()),
        ]
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Response {
    #[serde(flatten)]
    pub status: Status,

    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub playlist: Vec<Summary>,
}

/// A playlist as listed by the user and hot playlist endpoints.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Summary {
    pub id: u64,

    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub name: String,

    #[serde(default, rename = "coverImgUrl")]
    #[serde_as(as = "DefaultOnNull")]
    pub cover_url: String,

    #[serde(default, rename = "trackCount")]
    #[serde_as(as = "DefaultOnNull")]
    pub track_count: u64,

    #[serde(default)]
    pub creator: Option<Creator>,
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Creator {
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub nickname: String,
}

impl From<Summary> for PlaylistSummary {
    fn from(summary: Summary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            cover_url: summary.cover_url,
            track_count: summary.track_count,
            creator: summary.creator.unwrap_or_default().nickname,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_asks_for_first_hundred() {
        let query = Request { uid: 32_953_014 }.query();
        assert_eq!(
            query.map(|(key, value)| format!("{key}={value}")),
            ["offset=0", "limit=100", "uid=32953014"]
        );
    }

    #[test]
    fn lists_playlists_in_order() {
        let response: Response = serde_json::from_str(
            r#"{"code": 200, "more": false, "playlist": [
                {"id": 2, "name": "Liked", "coverImgUrl": "https://p1/a.jpg", "trackCount": 120, "creator": {"nickname": "me"}},
                {"id": 1, "name": null, "trackCount": null, "creator": null}
            ]}"#,
        )
        .unwrap();
        assert!(response.status.is_ok());

        let playlists: Vec<PlaylistSummary> =
            response.playlist.into_iter().map(PlaylistSummary::from).collect();
        assert_eq!(
            playlists,
            [
                PlaylistSummary {
                    id: 2,
                    name: "Liked".to_owned(),
                    cover_url: "https://p1/a.jpg".to_owned(),
                    track_count: 120,
                    creator: "me".to_owned(),
                },
                PlaylistSummary {
                    id: 1,
                    name: String::new(),
                    cover_url: String::new(),
                    track_count: 0,
                    creator: String::new(),
                },
            ]
        );
    }

    #[test]
    fn missing_list_is_empty() {
        let response: Response = serde_json::from_str(r#"{"code": 200, "playlist": null}"#).unwrap();
        assert!(response.playlist.is_empty());
    }
}

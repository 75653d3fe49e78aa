//! Keyword search over songs.
//!
//! # Wire Format
//!
//! Request: `GET /api/search/get?s=<keywords>&type=1&limit=30&offset=<n>`
//!
//! Response:
//! ```json
//! {
//!     "code": 200,
//!     "result": {
//!         "songCount": 300,
//!         "songs": [{
//!             "id": 1,
//!             "name": "Song",
//!             "artists": [{"id": 10, "name": "Artist"}],
//!             "album": {"id": 20, "name": "Album", "picId": 123}
//!         }]
//!     }
//! }
//! ```

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};

use super::{
    song_detail::{join_artists, Album, Artist},
    Endpoint, Status,
};
use crate::track::{TrackDetail, TrackId};

/// Search request parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    pub keywords: String,
    pub page: u32,
}

impl Endpoint for Request {
    const URL: &'static str = "https://music.163.com/api/search/get";
}

impl Request {
    /// Search type for single songs.
    const TYPE_SONG: &'static str = "1";

    /// Results per page.
    pub const LIMIT: u32 = 30;

    /// Offset step between pages, as used by the web client.
    pub const PAGE_STRIDE: u32 = 50;

    /// Query string pairs in wire order.
    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("s", self.keywords.clone()),
            ("type", Self::TYPE_SONG.to_owned()),
            ("limit", Self::LIMIT.to_string()),
            (
                "offset",
                self.page.saturating_mul(Self::PAGE_STRIDE).to_string(),
            ),
        ]
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Response {
    #[serde(flatten)]
    pub status: Status,

    #[serde(default)]
    pub result: Option<Songs>,
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Songs {
    #[serde(default, rename = "songCount")]
    #[serde_as(as = "DefaultOnNull")]
    pub song_count: u64,

    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub songs: Vec<Hit>,
}

/// One search hit. Uses the long field names of the legacy API.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Hit {
    pub id: TrackId,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub artists: Vec<Artist>,

    #[serde(default)]
    pub album: Option<Album>,
}

impl From<Hit> for TrackDetail {
    fn from(hit: Hit) -> Self {
        let artist = join_artists(hit.artists.iter().map(|artist| artist.name.as_deref()));
        let (album, cover_url) = match hit.album {
            Some(album) => (album.name, album.pic_url),
            None => (None, None),
        };

        Self {
            id: hit.id,
            title: hit.name.unwrap_or_else(|| Self::UNKNOWN_TITLE.to_owned()),
            artist,
            album: album.unwrap_or_else(|| Self::UNKNOWN_ALBUM.to_owned()),
            cover_url: cover_url.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_use_web_stride() {
        let request = Request {
            keywords: "海阔天空".to_owned(),
            page: 2,
        };
        let query = request.query();
        assert_eq!(query[0], ("s", "海阔天空".to_owned()));
        assert_eq!(query[2], ("limit", "30".to_owned()));
        assert_eq!(query[3], ("offset", "100".to_owned()));
    }

    #[test]
    fn decodes_hits() {
        let response: Response = serde_json::from_str(
            r#"{
                "code": 200,
                "result": {
                    "songCount": 2,
                    "songs": [
                        {"id": 347230, "name": "海阔天空", "artists": [{"id": 1, "name": "Beyond"}], "album": {"id": 2, "name": "乐与怒", "picId": 5}},
                        {"id": 347231, "name": null, "artists": null, "album": null}
                    ]
                }
            }"#,
        )
        .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result.song_count, 2);

        let tracks: Vec<TrackDetail> = result.songs.into_iter().map(TrackDetail::from).collect();
        assert_eq!(tracks[0].artist, "Beyond");
        assert_eq!(tracks[0].album, "乐与怒");
        assert_eq!(tracks[0].cover_url, "");
        assert_eq!(tracks[1].title, "Unknown Track");
    }

    #[test]
    fn no_result_block() {
        let response: Response = serde_json::from_str(r#"{"code": 200}"#).unwrap();
        assert!(response.result.is_none());
    }
}

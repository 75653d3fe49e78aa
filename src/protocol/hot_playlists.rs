//! Most popular playlists across all categories.
//!
//! # Wire Format
//!
//! Request: `GET /api/playlist/list?cat=全部&order=hot&limit=100&offset=0`
//!
//! Response (the list sits under `result` or at the top level depending on
//! the client the vendor thinks it is talking to):
//! ```json
//! {
//!     "code": 200,
//!     "playlists": [{"id": 1, "name": "...", "coverImgUrl": "...", "trackCount": 30}]
//! }
//! ```

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};

use super::{user_playlists::Summary, Endpoint, Status};

/// Hot playlist request. The endpoint takes no caller parameters.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Request;

impl Endpoint for Request {
    const URL: &'static str = "https://music.163.com/api/playlist/list";
}

impl Request {
    /// Category covering every playlist.
    pub const CATEGORY: &'static str = "全部";

    pub const LIMIT: u32 = 100;

    /// Query string pairs in wire order.
    #[must_use]
    pub fn query(self) -> [(&'static str, String); 4] {
        [
            ("cat", Self::CATEGORY.to_owned()),
            ("order", "hot".to_owned()),
            ("limit", Self::LIMIT.to_string()),
            ("offset", "0".to_owned()),
        ]
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Response {
    #[serde(flatten)]
    pub status: Status,

    #[serde(default)]
    pub result: Option<Playlists>,

    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub playlists: Vec<Summary>,
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Playlists {
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub playlists: Vec<Summary>,
}

impl Response {
    /// The listed playlists, preferring a non-empty `result.playlists`.
    #[must_use]
    pub fn into_playlists(self) -> Vec<Summary> {
        match self.result {
            Some(result) if !result.playlists.is_empty() => result.playlists,
            _ => self.playlists,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(response: Response) -> Vec<u64> {
        response
            .into_playlists()
            .into_iter()
            .map(|summary| summary.id)
            .collect()
    }

    #[test]
    fn query_is_url_encoded() {
        let url = url::Url::parse_with_params(Request::URL, Request.query()).unwrap();
        assert_eq!(
            url.query(),
            Some("cat=%E5%85%A8%E9%83%A8&order=hot&limit=100&offset=0")
        );
    }

    #[test]
    fn prefers_nested_result() {
        let response: Response = serde_json::from_str(
            r#"{"code": 200, "result": {"playlists": [{"id": 3}, {"id": 4}]}, "playlists": [{"id": 9}]}"#,
        )
        .unwrap();
        assert_eq!(ids(response), [3, 4]);
    }

    #[test]
    fn falls_back_to_top_level_list() {
        let response: Response = serde_json::from_str(
            r#"{"code": 200, "result": {"playlists": []}, "playlists": [{"id": 9, "name": "Hot"}]}"#,
        )
        .unwrap();
        assert_eq!(ids(response), [9]);

        let response: Response = serde_json::from_str(r#"{"code": 200}"#).unwrap();
        assert!(ids(response).is_empty());
    }
}

//! Lyric lookup.
//!
//! # Wire Format
//!
//! Request form fields: `id`, `cp=false`, `tv`, `lv`, `rv`, `kv`, `yv`,
//! `ytv`, `yrv` (all `0`).
//!
//! Response:
//! ```json
//! {
//!     "code": 200,
//!     "lrc": {"version": 7, "lyric": "[00:00.00] ..."},
//!     "tlyric": {"version": 1, "lyric": ""}
//! }
//! ```
//!
//! Instrumentals and tracks without lyrics omit `lrc` and `tlyric`, or
//! mark the track with `nolyric`/`uncollected` flags instead.

use serde::Deserialize;

use super::{Endpoint, Status};
use crate::track::{Lyrics, TrackId};

/// Lyric request form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    pub id: TrackId,
}

impl Endpoint for Request {
    const URL: &'static str = "https://interface3.music.163.com/api/song/lyric";
}

impl Request {
    /// Version flags asking for the latest of every lyric kind.
    const FLAGS: [(&'static str, &'static str); 8] = [
        ("cp", "false"),
        ("tv", "0"),
        ("lv", "0"),
        ("rv", "0"),
        ("kv", "0"),
        ("yv", "0"),
        ("ytv", "0"),
        ("yrv", "0"),
    ];

    /// Form fields of the request in wire order.
    #[must_use]
    pub fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![("id", self.id.to_string())];
        form.extend(Self::FLAGS.iter().map(|&(key, value)| (key, value.to_owned())));
        form
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Response {
    #[serde(flatten)]
    pub status: Status,

    #[serde(default)]
    pub lrc: Option<Block>,

    #[serde(default)]
    pub tlyric: Option<Block>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Block {
    #[serde(default)]
    pub lyric: Option<String>,
}

impl From<Response> for Lyrics {
    fn from(response: Response) -> Self {
        let text = |block: Option<Block>| block.and_then(|block| block.lyric).unwrap_or_default();

        Self {
            lyric: text(response.lrc),
            translated_lyric: text(response.tlyric),
        }
    }
}

//! Typed request and response bodies of the catalog endpoints.
//!
//! Vendor JSON is decoded once, at the client boundary, into the structures
//! in this module. Fields the pipeline can live without are optional or
//! defaulted, so that a missing or `null` field degrades gracefully instead
//! of failing the whole response.
//!
//! * [`song_url`]: encrypted stream-URL lookup (`eapi`)
//! * [`song_detail`]: batched song metadata
//! * [`lyric`]: original and translated lyrics
//! * [`search`]: keyword search
//! * [`playlist`]: playlist track listing
//! * [`user_playlists`]: playlists of a user
//! * [`hot_playlists`]: most popular playlists
//!
//! # Status Envelope
//!
//! Every response carries a numeric `code` next to the payload:
//!
//! ```json
//! {
//!     "code": 200,
//!     "message": "optional explanation",
//!     ...
//! }
//! ```
//!
//! Anything other than `200` means the vendor refused the request, even
//! when the HTTP status was a success.

pub mod hot_playlists;
pub mod lyric;
pub mod playlist;
pub mod quality;
pub mod search;
pub mod song_detail;
pub mod song_url;
pub mod user_playlists;

pub use quality::StreamQuality;

use std::fmt;

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};

use crate::error::{Error, Result};

/// Identifies a catalog endpoint.
pub trait Endpoint {
    /// Absolute URL of the endpoint.
    const URL: &'static str;
}

/// Status envelope shared by all vendor responses.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Status {
    /// Vendor result code, `200` on success.
    #[serde(default)]
    pub code: Option<i64>,

    /// Optional explanation accompanying a failure code.
    #[serde(default, alias = "msg")]
    #[serde_as(as = "DefaultOnNull")]
    pub message: String,
}

impl Status {
    /// The only code the vendor uses for success.
    pub const OK: i64 = 200;

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == Some(Self::OK)
    }

    /// Turns a failure code into an `UpstreamBadResponse` error.
    pub fn check(&self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(Error::bad_response(self.to_string()))
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.message.is_empty()) {
            (Some(code), true) => write!(f, "vendor code {code}"),
            (Some(code), false) => write!(f, "vendor code {code}: {}", self.message),
            (None, true) => write!(f, "vendor code missing"),
            (None, false) => write!(f, "vendor code missing: {}", self.message),
        }
    }
}

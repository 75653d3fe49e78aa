//! Stream URL lookup.
//!
//! This is the only endpoint of the pipeline behind the obfuscation
//! protocol: the request below is serialized, encrypted with
//! [`crate::eapi::Cipher`] and sent as the `params` form field.
//!
//! # Wire Format
//!
//! Request (before encryption):
//! ```json
//! {
//!     "ids": ["2053369738"],
//!     "level": "lossless",
//!     "encodeType": "flac",
//!     "header": "{\"os\":\"pc\",\"appver\":\"\",\"osver\":\"\",\"deviceId\":\"pyncm!\",\"requestId\":\"23456789\"}",
//!     "immerseType": "c51"
//! }
//! ```
//!
//! `immerseType` is only present for the `sky` tier.
//!
//! Response:
//! ```json
//! {
//!     "code": 200,
//!     "data": [{
//!         "id": 2053369738,
//!         "url": "https://m801.music.126.net/...",
//!         "br": 999000,
//!         "size": 35651584,
//!         "level": "lossless",
//!         "encodeType": "flac"
//!     }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr};
use veil::Redact;

use super::{Endpoint, Status, StreamQuality};
use crate::{
    error::{Error, Result},
    track::TrackId,
};

/// Encrypted stream URL request.
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Request {
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub ids: Vec<TrackId>,

    pub level: StreamQuality,

    #[serde(rename = "encodeType")]
    pub encode_type: String,

    /// Client description, serialized to a JSON string.
    pub header: String,

    #[serde(rename = "immerseType", skip_serializing_if = "Option::is_none")]
    pub immerse_type: Option<String>,
}

impl Endpoint for Request {
    const URL: &'static str = "https://interface3.music.163.com/eapi/song/enhance/player/url/v1";
}

impl Request {
    /// Preferred container. The vendor falls back to whatever the tier
    /// offers when the track is not available as FLAC.
    const ENCODE_TYPE: &'static str = "flac";

    /// Immersive audio profile requested for the `sky` tier.
    const IMMERSE_TYPE: &'static str = "c51";

    /// Builds a request for one track with a fresh random request ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::CipherFailure` if the client header cannot be
    /// serialized.
    pub fn new(id: TrackId, quality: StreamQuality) -> Result<Self> {
        let header = serde_json::to_string(&Header::new()).map_err(Error::cipher_failure)?;

        Ok(Self {
            ids: vec![id],
            level: quality,
            encode_type: Self::ENCODE_TYPE.to_owned(),
            header,
            immerse_type: quality
                .is_immersive()
                .then(|| Self::IMMERSE_TYPE.to_owned()),
        })
    }
}

/// Client description embedded in the encrypted request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Header {
    pub os: &'static str,
    pub appver: &'static str,
    pub osver: &'static str,
    #[serde(rename = "deviceId")]
    pub device_id: &'static str,
    #[serde(rename = "requestId")]
    pub request_id: String,
}

impl Header {
    /// Range the desktop client draws request IDs from.
    const REQUEST_ID_RANGE: std::ops::Range<u32> = 20_000_000..30_000_000;

    #[must_use]
    pub fn new() -> Self {
        Self {
            os: "pc",
            appver: "",
            osver: "",
            device_id: "pyncm!",
            request_id: fastrand::u32(Self::REQUEST_ID_RANGE).to_string(),
        }
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream URL response.
#[serde_as]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Response {
    #[serde(flatten)]
    pub status: Status,

    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub data: Vec<Stream>,
}

/// One stream entry.
///
/// `url` is `None` when the track is not available at this tier for the
/// current session (region locks, missing subscription).
#[serde_as]
#[derive(Clone, Deserialize, PartialEq, Redact)]
pub struct Stream {
    /// Vendor-confirmed track ID. Can differ from the requested one for
    /// region-redirected tracks.
    pub id: TrackId,

    #[redact]
    #[serde(default)]
    pub url: Option<String>,

    /// Bitrate in bits per second.
    #[serde(default, rename = "br")]
    #[serde_as(as = "DefaultOnNull")]
    pub bitrate: u64,

    /// File size in bytes.
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub size: i64,

    /// Quality code of the stream actually served.
    #[serde(default)]
    #[serde_as(as = "DefaultOnNull")]
    pub level: String,

    #[serde(default, rename = "encodeType")]
    #[serde_as(as = "DefaultOnNull")]
    pub encode_type: String,
}

impl Response {
    /// Returns the first stream if the vendor reported success and handed
    /// out a non-empty URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::UpstreamBadResponse` on a failure code, an empty
    /// `data` array or a missing URL.
    pub fn into_stream(self) -> Result<(Stream, String)> {
        self.status.check()?;

        let stream = self
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::bad_response("no stream data received"))?;

        match stream.url.as_deref() {
            Some(url) if !url.is_empty() => {
                let url = url.to_owned();
                Ok((stream, url))
            }
            _ => Err(Error::bad_response(format!(
                "no stream url for track {}",
                stream.id
            ))),
        }
    }
}

//! Stream quality tiers offered by the catalog.
//!
//! # Wire Format
//!
//! Tiers are sent and received as lowercase codes:
//! `standard`, `exhigh`, `lossless`, `hires`, `sky`, `jyeffect`, `jymaster`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Quality tier of a stream URL.
#[derive(
    Copy, Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StreamQuality {
    /// 128 kbps
    #[default]
    Standard,
    /// 320 kbps
    ExHigh,
    /// CD quality FLAC
    Lossless,
    /// Up to 24 bit / 192 kHz
    HiRes,
    /// Immersive surround
    Sky,
    /// High-definition surround
    JyEffect,
    /// Studio master
    JyMaster,
}

impl StreamQuality {
    /// All tiers from lowest to highest.
    pub const ALL: [Self; 7] = [
        Self::Standard,
        Self::ExHigh,
        Self::Lossless,
        Self::HiRes,
        Self::Sky,
        Self::JyEffect,
        Self::JyMaster,
    ];

    /// Label shown for codes that are not part of the table.
    pub const UNKNOWN_LABEL: &'static str = "Unknown Quality";

    /// The code used on the wire.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::ExHigh => "exhigh",
            Self::Lossless => "lossless",
            Self::HiRes => "hires",
            Self::Sky => "sky",
            Self::JyEffect => "jyeffect",
            Self::JyMaster => "jymaster",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::ExHigh => "Extremely High",
            Self::Lossless => "Lossless",
            Self::HiRes => "Hi-Res",
            Self::Sky => "Immersive Surround",
            Self::JyEffect => "HD Surround",
            Self::JyMaster => "Ultra HD Master",
        }
    }

    /// Whether the stream request needs the immersive-audio flag.
    #[must_use]
    pub fn is_immersive(self) -> bool {
        self == Self::Sky
    }
}

impl fmt::Display for StreamQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for StreamQuality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|quality| quality.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_argument(format!("unknown stream quality: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for quality in StreamQuality::ALL {
            assert_eq!(quality.code().parse::<StreamQuality>().unwrap(), quality);
        }
    }

    #[test]
    fn serde_uses_wire_codes() {
        let json = serde_json::to_string(&StreamQuality::JyMaster).unwrap();
        assert_eq!(json, r#""jymaster""#);
        let quality: StreamQuality = serde_json::from_str(r#""exhigh""#).unwrap();
        assert_eq!(quality, StreamQuality::ExHigh);
    }

    #[test]
    fn parsing_is_lenient_on_case() {
        assert_eq!("HiRes".parse::<StreamQuality>().unwrap(), StreamQuality::HiRes);
        assert!("ultra".parse::<StreamQuality>().is_err());
    }

    #[test]
    fn only_sky_is_immersive() {
        let immersive: Vec<_> = StreamQuality::ALL
            .into_iter()
            .filter(|q| q.is_immersive())
            .collect();
        assert_eq!(immersive, [StreamQuality::Sky]);
    }
}

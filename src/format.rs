//! Display formatting for stream metadata.

use crate::protocol::quality::StreamQuality;

/// Units used by [`size_label`], in increasing order.
const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Maps a quality code to its display label.
///
/// Total: codes outside the known tiers yield
/// [`StreamQuality::UNKNOWN_LABEL`].
#[must_use]
pub fn quality_label(code: &str) -> &'static str {
    code.parse::<StreamQuality>()
        .map_or(StreamQuality::UNKNOWN_LABEL, StreamQuality::label)
}

/// Formats a byte count with two decimals in the largest unit up to TB.
///
/// Zero and negative sizes format as `"0B"`.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn size_label(bytes: i64) -> String {
    if bytes <= 0 {
        return "0B".to_owned();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{size:.2}{}", SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_quality_labels() {
        assert_eq!(quality_label("standard"), "Standard");
        assert_eq!(quality_label("lossless"), "Lossless");
        assert_eq!(quality_label("sky"), "Immersive Surround");
        assert_eq!(quality_label("jymaster"), "Ultra HD Master");
    }

    #[test]
    fn quality_label_is_total() {
        for code in ["", "none", "dolby", "exhigh ", "\u{0}"] {
            assert!(!quality_label(code).is_empty(), "{code:?}");
        }
        assert_eq!(quality_label("dolby"), "Unknown Quality");
    }

    #[test]
    fn sizes() {
        assert_eq!(size_label(0), "0B");
        assert_eq!(size_label(-42), "0B");
        assert_eq!(size_label(100), "100.00B");
        assert_eq!(size_label(1023), "1023.00B");
        assert_eq!(size_label(1024), "1.00KB");
        assert_eq!(size_label(1536), "1.50KB");
        assert_eq!(size_label(35_651_584), "34.00MB");
        assert_eq!(size_label(3 * 1024 * 1024 * 1024), "3.00GB");
    }

    #[test]
    fn terabytes_are_the_ceiling() {
        let petabyte = 1024_i64.pow(5);
        assert_eq!(size_label(petabyte), "1024.00TB");
    }
}

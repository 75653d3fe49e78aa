//! Vendor session credential.
//!
//! The credential is the `Cookie` header value of a logged-in desktop or
//! web session, for example `MUSIC_U=...; __csrf=...`. It unlocks higher
//! quality tiers and subscriber-only tracks. Without it, only tracks that
//! are free to stream resolve.
//!
//! The value grants full access to the account and is redacted from all
//! debug output.

use std::{fs, str::FromStr};

use serde::Deserialize;
use veil::Redact;

use crate::error::{Error, Result};

/// Session cookie string.
#[derive(Clone, Default, Eq, PartialEq, Hash, Redact)]
#[redact(all)]
pub struct Credential(String);

/// On-disk secrets as read from `secrets.toml`.
#[derive(Clone, Default, Deserialize, Redact)]
pub struct Secrets {
    /// Session cookie string.
    #[redact]
    #[serde(default)]
    pub cookie: Option<String>,

    /// Override for the `eapi` cipher key.
    #[redact]
    #[serde(default)]
    pub cipher_key: Option<String>,
}

impl Secrets {
    /// Files larger than this are rejected before reading.
    const MAX_FILE_SIZE: u64 = 8 * 1024;

    /// Reads secrets from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the file does not exist, is too
    /// large, or is not valid TOML.
    pub fn from_file(path: &str) -> Result<Self> {
        // Prevent out-of-memory condition: the file should be small.
        let attributes = fs::metadata(path)?;
        let file_size = attributes.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::invalid_argument(format!("{path} is too large")));
        }

        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::invalid_argument(format!("{path}: {e}")))
    }
}

impl Credential {
    /// Cookie pairs in the order they appear.
    ///
    /// Entries are separated by `;` and split at the first `=`. Entries
    /// without a value are skipped.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.0
            .split(';')
            .filter_map(|entry| {
                let (name, value) = entry.trim().split_once('=')?;
                let (name, value) = (name.trim(), value.trim());
                (!name.is_empty() && !value.is_empty()).then_some((name, value))
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }

    /// The raw cookie string. Handle with care.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl FromStr for Credential {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let credential = Self(s.trim().to_owned());

        // Header values cannot contain control characters.
        if credential.0.chars().any(char::is_control) {
            return Err(Error::invalid_argument(
                "credential contains control characters",
            ));
        }

        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cookie_pairs() {
        let credential: Credential = " MUSIC_U=abc=def; __csrf=123 ;empty=; junk; =x"
            .parse()
            .unwrap();
        assert_eq!(
            credential.pairs(),
            [("MUSIC_U", "abc=def"), ("__csrf", "123")]
        );
    }

    #[test]
    fn blank_credential_is_empty() {
        let credential: Credential = "   ".parse().unwrap();
        assert!(credential.is_empty());
        assert!(Credential::default().is_empty());
    }

    #[test]
    fn control_characters_are_rejected() {
        assert!("MUSIC_U=a\nb".parse::<Credential>().is_err());
    }

    #[test]
    fn debug_output_is_redacted() {
        let credential: Credential = "MUSIC_U=supersecret".parse().unwrap();
        assert!(!format!("{credential:?}").contains("supersecret"));
    }

    #[test]
    fn secrets_from_toml() {
        let secrets: Secrets = toml::from_str(
            r#"
            cookie = "MUSIC_U=abc"
            cipher_key = "0123456789abcdef"
            "#,
        )
        .unwrap();
        assert_eq!(secrets.cookie.as_deref(), Some("MUSIC_U=abc"));
        assert_eq!(secrets.cipher_key.as_deref(), Some("0123456789abcdef"));

        let empty: Secrets = toml::from_str("").unwrap();
        assert!(empty.cookie.is_none());
    }

    #[test]
    fn missing_secrets_file() {
        let err = Secrets::from_file("/nonexistent/secrets.toml").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidArgument);
    }
}

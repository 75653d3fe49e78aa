//! Resolver configuration.
//!
//! Built once at startup and handed to the catalog client by reference.
//! Nothing in here changes after construction.

use std::time::Duration;

use crate::{
    credential::{Credential, Secrets},
    eapi::Key,
    error::Result,
    protocol::StreamQuality,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// `User-Agent` sent with every catalog request.
    pub user_agent: String,

    /// Session cookie of a logged-in account.
    pub credential: Credential,

    /// Key for the `eapi` obfuscation protocol.
    pub cipher_key: Key,

    /// Timeout of each individual catalog request.
    pub request_timeout: Duration,

    /// Timeout of the short-link redirect lookup.
    pub redirect_timeout: Duration,

    /// Number of IDs per batched detail request.
    pub chunk_size: usize,

    /// Number of batched detail requests in flight at once.
    pub chunk_concurrency: usize,

    /// Quality tier used when the caller does not ask for one.
    pub default_quality: StreamQuality,
}

impl Config {
    /// Mimic the desktop client: some endpoints serve reduced data to
    /// unknown agents.
    pub const DESKTOP_USER_AGENT: &'static str = "Mozilla/5.0 (Windows NT 10.0; WOW64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Safari/537.36 Chrome/91.0.4472.164 \
        NeteaseMusicDesktop/2.10.2.200154";

    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_REDIRECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Practical upper bound of IDs accepted by the detail endpoint.
    pub const DEFAULT_CHUNK_SIZE: usize = 50;

    pub const DEFAULT_CHUNK_CONCURRENCY: usize = 4;

    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        if credential.is_empty() {
            warn!("no session credential configured; only free tracks will resolve");
        }

        Self {
            user_agent: Self::DESKTOP_USER_AGENT.to_owned(),
            credential,
            cipher_key: Key::default(),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            redirect_timeout: Self::DEFAULT_REDIRECT_TIMEOUT,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            chunk_concurrency: Self::DEFAULT_CHUNK_CONCURRENCY,
            default_quality: StreamQuality::default(),
        }
    }

    /// Builds a configuration from secrets read off disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the credential or cipher key
    /// are malformed.
    pub fn with_secrets(secrets: &Secrets) -> Result<Self> {
        let credential = secrets
            .cookie
            .as_deref()
            .map(str::parse::<Credential>)
            .transpose()?
            .unwrap_or_default();

        let mut config = Self::with_credential(credential);
        if let Some(key) = secrets.cipher_key.as_deref() {
            config.cipher_key = key.parse()?;
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_credential(Credential::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.redirect_timeout, Duration::from_secs(5));
        assert_eq!(config.chunk_size, 50);
        assert_eq!(config.cipher_key, Key::default());
        assert!(config.user_agent.contains("NeteaseMusicDesktop"));
        assert!(!config.user_agent.contains("  "));
    }

    #[test]
    fn secrets_override_key() {
        let secrets = Secrets {
            cookie: Some("MUSIC_U=abc".to_owned()),
            cipher_key: Some("0123456789abcdef".to_owned()),
        };
        let config = Config::with_secrets(&secrets).unwrap();
        assert_eq!(config.credential.pairs(), [("MUSIC_U", "abc")]);
        assert_eq!(&*config.cipher_key, b"0123456789abcdef");
    }

    #[test]
    fn bad_key_is_rejected() {
        let secrets = Secrets {
            cookie: None,
            cipher_key: Some("too short".to_owned()),
        };
        assert!(Config::with_secrets(&secrets).is_err());
    }
}

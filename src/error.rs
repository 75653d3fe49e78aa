//! Error handling for the resolution pipeline.
//!
//! Every failure is classified into an [`ErrorKind`] so that callers can tell
//! fatal failures (the track cannot be resolved) from partial ones (some
//! optional data is missing) without inspecting transport details.
//!
//! # Error Categories
//!
//! * Input errors: [`ErrorKind::UnresolvableIdentifier`], [`ErrorKind::InvalidArgument`]
//! * Local protocol errors: [`ErrorKind::CipherFailure`]
//! * Upstream errors: [`ErrorKind::UpstreamTimeout`], [`ErrorKind::UpstreamHttpError`],
//!   [`ErrorKind::UpstreamBadResponse`]
//! * Non-fatal: [`ErrorKind::PartialDataUnavailable`]
//!
//! Errors raised inside the single-track pipeline are tagged with the
//! [`Stage`] they originated from.
//!
//! # Example
//!
//! ```rust
//! use ncm_resolver::error::{Error, ErrorKind, Result};
//!
//! fn parse(input: &str) -> Result<u64> {
//!     input
//!         .parse()
//!         .map_err(|_| Error::unresolvable_identifier(format!("{input} is not a track id")))
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;

use thiserror::Error;

/// Main error type combining error kind, pipeline stage and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Pipeline stage the error originated from, if any
    pub stage: Option<Stage>,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Standard result type for resolver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories of the resolution pipeline.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    /// The input could not be turned into a catalog track ID.
    #[error("unresolvable identifier")]
    UnresolvableIdentifier,

    /// The request payload could not be serialized or encrypted.
    #[error("cipher failure")]
    CipherFailure,

    /// An upstream call or the whole pipeline ran out of time.
    #[error("upstream timed out")]
    UpstreamTimeout,

    /// Transport failure or non-success HTTP status.
    #[error("upstream HTTP error")]
    UpstreamHttpError,

    /// The vendor answered, but not with what was asked for.
    #[error("upstream bad response")]
    UpstreamBadResponse,

    /// Optional data is missing. Never fatal to a resolution.
    #[error("partial data unavailable")]
    PartialDataUnavailable,

    /// Invalid configuration or caller-supplied argument.
    #[error("invalid argument specified")]
    InvalidArgument,

    /// Unexpected internal error.
    #[error("internal error")]
    Internal,
}

impl ErrorKind {
    /// Whether this kind aborts a single-track resolution.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        self != Self::PartialDataUnavailable
    }
}

/// Step of the single-track pipeline.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    /// Normalizing the caller's input into a track ID.
    Identifier,
    /// Building the encrypted request and fetching the stream URL.
    StreamUrl,
    /// Fetching the track detail.
    Detail,
    /// Fetching the lyrics.
    Lyric,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identifier => "identifier",
            Self::StreamUrl => "stream url",
            Self::Detail => "detail",
            Self::Lyric => "lyric",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            stage: None,
            error: error.into(),
        }
    }

    /// Tags the error with the pipeline stage it came from.
    ///
    /// A stage that was already set is kept, so errors bubbling up through
    /// several layers keep their origin.
    #[must_use]
    pub fn at(mut self, stage: Stage) -> Self {
        self.stage.get_or_insert(stage);
        self
    }

    /// Attempts to downcast the underlying error to a concrete type.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    pub fn unresolvable_identifier<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::UnresolvableIdentifier, error)
    }

    pub fn cipher_failure<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::CipherFailure, error)
    }

    pub fn upstream_timeout<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::UpstreamTimeout, error)
    }

    pub fn upstream_http<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::UpstreamHttpError, error)
    }

    /// Creates an error for vendor payloads that are malformed or report
    /// a non-success code.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::bad_response("vendor code 404: track unavailable");
    /// assert_eq!(err.kind, ErrorKind::UpstreamBadResponse);
    /// ```
    pub fn bad_response<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::UpstreamBadResponse, error)
    }

    pub fn partial_data<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::PartialDataUnavailable, error)
    }

    pub fn invalid_argument<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::InvalidArgument, error)
    }

    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "{} at {stage}: {}", self.kind, self.error),
            None => write!(f, "{}: {}", self.kind, self.error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// Converts HTTP client errors into upstream error kinds.
///
/// Maps request errors:
/// * Timeouts -> `UpstreamTimeout`
/// * Body decoding -> `UpstreamBadResponse`
/// * Builder errors -> `InvalidArgument`
/// * Others (connect, status, redirect) -> `UpstreamHttpError`
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::upstream_timeout(e);
        }
        if e.is_decode() {
            return Self::bad_response(e);
        }
        if e.is_builder() {
            return Self::invalid_argument(e);
        }
        Self::upstream_http(e)
    }
}

/// Converts JSON errors to `UpstreamBadResponse`.
///
/// Serialization of our own payloads goes through the cipher and is
/// classified there; anything reaching this conversion is a vendor body.
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::bad_response(e)
    }
}

/// Converts timeout errors to `UpstreamTimeout`.
impl From<tokio::time::error::Elapsed> for Error {
    fn from(e: tokio::time::error::Elapsed) -> Self {
        Self::upstream_timeout(e.to_string())
    }
}

/// Converts URL parsing errors to `InvalidArgument`.
impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::invalid_argument(e)
    }
}

/// Converts header value errors to `InvalidArgument`.
impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::invalid_argument(e)
    }
}

/// Converts I/O errors to `InvalidArgument`.
///
/// The crate only touches the filesystem to read configuration.
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::invalid_argument(e)
    }
}

/// Converts TOML errors to `InvalidArgument`.
impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::invalid_argument(e)
    }
}

/// Converts integer parsing errors to `UnresolvableIdentifier`.
impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::unresolvable_identifier(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_partial_data_is_non_fatal() {
        assert!(!ErrorKind::PartialDataUnavailable.is_fatal());
        assert!(ErrorKind::UnresolvableIdentifier.is_fatal());
        assert!(ErrorKind::CipherFailure.is_fatal());
        assert!(ErrorKind::UpstreamTimeout.is_fatal());
        assert!(ErrorKind::UpstreamHttpError.is_fatal());
        assert!(ErrorKind::UpstreamBadResponse.is_fatal());
    }

    #[test]
    fn first_stage_sticks() {
        let err = Error::bad_response("no songs")
            .at(Stage::Detail)
            .at(Stage::StreamUrl);
        assert_eq!(err.stage, Some(Stage::Detail));
        assert_eq!(err.to_string(), "upstream bad response at detail: no songs");
    }

    #[test]
    fn display_without_stage() {
        let err = Error::unresolvable_identifier("empty input");
        assert_eq!(err.to_string(), "unresolvable identifier: empty input");
    }

    #[test]
    fn parse_int_is_unresolvable() {
        let err: Error = "abc".parse::<u64>().unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::UnresolvableIdentifier);
    }
}

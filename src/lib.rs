//! Resolves NetEase Cloud Music tracks into playable streams.
//!
//! Given a track ID, a catalog URL or a short link, the [`resolver`] fetches
//! a stream URL through the encrypted `eapi` endpoint, then the track detail
//! and lyrics, and assembles them into one record. The [`batch`] module looks
//! up details of many tracks at once for playlist views.
//!
//! ```rust
//! use ncm_resolver::{catalog::Catalog, config::Config, protocol::StreamQuality, resolver::Resolver};
//!
//! let config = Config::default();
//! let resolver = Resolver::new(Catalog::new(&config)?, &config);
//! let track = resolver.resolve("https://163cn.tv/abc123", StreamQuality::Lossless).await?;
//! ```
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

#[macro_use]
extern crate log;

pub mod batch;
pub mod catalog;
pub mod config;
pub mod credential;
pub mod eapi;
pub mod error;
pub mod format;
pub mod http;
pub mod identifier;
pub mod protocol;
pub mod resolver;
pub mod track;

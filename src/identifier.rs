//! Normalization of caller input into a catalog track ID.
//!
//! Accepted inputs:
//! * a numeric track ID, such as `2053369738`
//! * a catalog URL, such as `https://music.163.com/#/song?id=2053369738`
//! * a short link, such as `https://163cn.tv/abc123`, which redirects to a
//!   catalog URL
//!
//! Short links are expanded with a single request that does not follow the
//! redirect. When that request fails the link is used as-is, which then
//! fails to parse unless it happens to contain an ID.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::{
    catalog::CatalogApi,
    error::{Error, Result},
    track::TrackId,
};

/// Domain of the vendor's link shortener.
pub const SHORT_LINK_DOMAIN: &str = "163cn.tv";

/// Domain of catalog web pages.
pub const CATALOG_DOMAIN: &str = "music.163.com";

/// `id=` preceded by a parameter or path boundary.
static BOUNDED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&#/]id=([^&#]*)").expect("invalid id pattern"));

/// Any `id=`, including those that end a longer name like `userid=`.
static ANY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id=([^&#]*)").expect("invalid id pattern"));

/// Interpretation of a caller's input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Query {
    /// A bare track ID.
    Id(TrackId),
    /// A short link to be expanded before extraction.
    ShortLink(String),
    /// A catalog URL carrying an `id` parameter.
    CatalogUrl(String),
}

impl Query {
    /// Classifies `input` without touching the network.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnresolvableIdentifier` if the input is neither a
    /// link nor a valid track ID.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::unresolvable_identifier("empty identifier"));
        }

        if input.contains(SHORT_LINK_DOMAIN) {
            Ok(Self::ShortLink(input.to_owned()))
        } else if input.contains(CATALOG_DOMAIN) {
            Ok(Self::CatalogUrl(input.to_owned()))
        } else {
            parse_id(input).map(Self::Id)
        }
    }
}

/// Extracts the track ID from the `id` parameter of a catalog URL.
///
/// A parameter preceded by `?`, `&`, `#` or `/` wins over one that merely
/// ends in `id=`. The value ends at the next `&` or `#`.
///
/// # Errors
///
/// Returns `Error::UnresolvableIdentifier` if the URL has no `id`
/// parameter or its value is not a valid track ID.
pub fn extract_id(url: &str) -> Result<TrackId> {
    let captures = BOUNDED_ID
        .captures(url)
        .or_else(|| ANY_ID.captures(url))
        .ok_or_else(|| Error::unresolvable_identifier(format!("no id parameter in {url}")))?;

    parse_id(&captures[1])
}

/// Resolves caller input into a track ID.
///
/// # Errors
///
/// Returns `Error::UnresolvableIdentifier` if no track ID can be derived.
/// A failed short-link lookup is not an error by itself.
pub async fn resolve<C>(catalog: &C, input: &str) -> Result<TrackId>
where
    C: CatalogApi + ?Sized,
{
    match Query::parse(input)? {
        Query::Id(id) => Ok(id),
        Query::CatalogUrl(url) => extract_id(&url),
        Query::ShortLink(link) => {
            let effective = match catalog.redirect_location(&link).await {
                Ok(Some(location)) => {
                    debug!("short link {link} redirects to {location}");
                    location
                }
                Ok(None) => {
                    warn!("short link {link} did not redirect");
                    link
                }
                Err(e) => {
                    warn!("failed to expand short link {link}: {e}");
                    link
                }
            };

            if effective.contains(CATALOG_DOMAIN) {
                extract_id(&effective)
            } else {
                parse_id(&effective)
            }
        }
    }
}

fn parse_id(text: &str) -> Result<TrackId> {
    text.trim()
        .parse()
        .map_err(|_| Error::unresolvable_identifier(format!("{text} is not a track id")))
}

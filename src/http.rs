//! HTTP client with rate limiting and cookie management for the catalog.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * Request rate limiting so bursts of batch lookups do not hammer the
//!   vendor
//! * Cookie management for the session credential
//! * Consistent timeouts and headers
//! * A separate redirect-free client for expanding short links
//!
//! # Rate Limiting
//!
//! Allows up to 50 calls per 5-second interval. Bursts are served
//! immediately; requests beyond the limit are delayed.
//!
//! # Example
//!
//! ```rust
//! use ncm_resolver::http::Client;
//!
//! let client = Client::with_cookies(&config, cookie_jar)?;
//! let request = client.post_form(url, [("id", "347230")]);
//! let response = client.execute(request).await?;
//! ```

use std::{future::Future, num::NonZeroU32, sync::Arc, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    self,
    cookie::CookieStore,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, LOCATION, USER_AGENT},
    redirect, Body, Method, Url,
};

use crate::{config::Config, error::Result};

/// HTTP client with built-in rate limiting and cookie support.
pub struct Client {
    /// Unlimited request client for special cases.
    ///
    /// Direct access to underlying client without rate limiting.
    pub unlimited: reqwest::Client,

    /// Client that never follows redirects.
    ///
    /// Carries no cookies: short links are resolved anonymously.
    no_redirects: reqwest::Client,

    /// Rate limiter shared by all catalog calls.
    rate_limiter: DefaultDirectRateLimiter,

    /// Cookie storage for the session credential.
    pub cookie_jar: Option<Arc<dyn CookieStore>>,
}

impl Client {
    /// Rolling window of the rate limiter.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Maximum calls per interval.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 50;

    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Content type of form-encoded request bodies.
    const FORM_CONTENT: HeaderValue = HeaderValue::from_static("application/x-www-form-urlencoded");

    /// Creates a new client with optional cookie storage.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * HTTP client creation fails
    /// * The user agent is not a valid header value
    ///
    /// # Panics
    ///
    /// Panics if rate limit parameters are zero.
    pub fn new<C>(config: &Config, cookie_jar: Option<C>) -> Result<Self>
    where
        C: CookieStore + 'static,
    {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        let user_agent = HeaderValue::from_str(&config.user_agent)?;
        headers.insert(USER_AGENT, user_agent.clone());

        // Wrap `cookie_jar` in an `Arc` for asynchronous use.
        let cookie_jar = cookie_jar.map(Arc::new);

        let mut http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .timeout(config.request_timeout)
            .default_headers(headers);

        if let Some(ref jar) = cookie_jar {
            http_client = http_client.cookie_provider(Arc::clone(jar));
        }

        let no_redirects = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(config.redirect_timeout)
            .user_agent(user_agent)
            .build()?;

        // Rate limit own requests as to not DoS the vendor infrastructure.
        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .expect("quota time interval is zero")
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .expect("calls per interval is zero"),
            );

        Ok(Self {
            unlimited: http_client.build()?,
            no_redirects,
            rate_limiter: governor::RateLimiter::direct(quota),
            cookie_jar: cookie_jar.map(|jar| jar as _), // coerce compiler to infer type
        })
    }

    /// Creates a new client with cookie storage.
    ///
    /// # Errors
    ///
    /// Returns error if client creation fails.
    pub fn with_cookies<C>(config: &Config, cookie_jar: C) -> Result<Self>
    where
        C: CookieStore + 'static,
    {
        Self::new(config, Some(cookie_jar))
    }

    /// Creates a new client without cookie storage.
    ///
    /// # Errors
    ///
    /// Returns error if client creation fails.
    pub fn without_cookies(config: &Config) -> Result<Self> {
        // Need to specify a type that satisfies the trait bounds.
        Self::new(config, None::<reqwest::cookie::Jar>)
    }

    /// Builds a request with specified method, URL and body.
    pub fn request<U, T>(&self, method: Method, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        let mut request = reqwest::Request::new(method, url.into());
        let body_mut = request.body_mut();
        *body_mut = Some(body.into());

        request
    }

    /// Builds a POST request.
    pub fn post<U, T>(&self, url: U, body: T) -> reqwest::Request
    where
        U: Into<Url>,
        T: Into<Body>,
    {
        self.request(Method::POST, url, body)
    }

    /// Builds a GET request without a body.
    pub fn get<U>(&self, url: U) -> reqwest::Request
    where
        U: Into<Url>,
    {
        reqwest::Request::new(Method::GET, url.into())
    }

    /// Builds a POST request with a form-encoded body.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let request = client.post_form(url, [("params", encrypted)]);
    /// ```
    pub fn post_form<U, I, K, V>(&self, url: U, fields: I) -> reqwest::Request
    where
        U: Into<Url>,
        I: IntoIterator,
        I::Item: std::borrow::Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();

        let mut request = self.post(url, body);
        request.headers_mut().insert(CONTENT_TYPE, Self::FORM_CONTENT);
        request
    }

    /// Executes a request with rate limiting.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// * Request execution fails
    /// * Network error occurs
    /// * The request times out
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        // No need to await with jitter because the level of concurrency is low.
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }

    /// Issues a GET without following redirects and returns the target of
    /// the redirect, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or times out.
    pub async fn location(&self, url: Url) -> Result<Option<String>> {
        self.rate_limiter.until_ready().await;

        let response = self.no_redirects.get(url).send().await?;
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);

        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://interface3.music.163.com/api/song/lyric").unwrap()
    }

    #[test]
    fn form_body_is_urlencoded() {
        let client = Client::without_cookies(&Config::default()).unwrap();
        let request = client.post_form(url(), [("c", r#"[{"id":"1","v":0}]"#), ("x", "a b")]);

        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        let body = request.body().and_then(Body::as_bytes).unwrap();
        assert_eq!(
            std::str::from_utf8(body).unwrap(),
            "c=%5B%7B%22id%22%3A%221%22%2C%22v%22%3A0%7D%5D&x=a+b"
        );
    }

    #[test]
    fn get_has_no_body() {
        let client = Client::without_cookies(&Config::default()).unwrap();
        let request = client.get(url());
        assert_eq!(request.method(), Method::GET);
        assert!(request.body().is_none());
    }
}

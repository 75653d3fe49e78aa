//! Client for the catalog endpoints the resolver depends on.
//!
//! [`CatalogApi`] is the seam between the pipeline and the network. The
//! production implementation is [`Catalog`]; tests substitute an in-memory
//! fake.
//!
//! All calls share one rate-limited HTTP client. The session credential is
//! installed into its cookie jar once, at construction, next to the cookies
//! the desktop client always sends.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderValue, REFERER},
    Url,
};
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    eapi::Cipher,
    error::{Error, Result},
    http::Client as HttpClient,
    protocol::{
        hot_playlists, lyric, playlist, search, song_detail, song_url, user_playlists, Endpoint,
        StreamQuality,
    },
    track::{Lyrics, PlaylistSummary, TrackDetail, TrackId},
};

pub use song_url::Stream;

/// Operations of the external catalog service.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Looks up a playable stream for `id` at the requested tier.
    ///
    /// Returns the stream entry and its non-empty URL. The entry carries the
    /// vendor-confirmed track ID, which may differ from `id`.
    async fn stream_url(&self, id: TrackId, quality: StreamQuality) -> Result<(Stream, String)>;

    /// Looks up metadata of many tracks in one call.
    ///
    /// Tracks the vendor does not know are absent from the result.
    async fn details(&self, ids: &[TrackId]) -> Result<Vec<TrackDetail>>;

    /// Looks up metadata of a single track.
    async fn detail(&self, id: TrackId) -> Result<TrackDetail> {
        self.details(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::bad_response(format!("no detail for track {id}")))
    }

    /// Looks up original and translated lyrics. Missing lyrics are empty.
    async fn lyric(&self, id: TrackId) -> Result<Lyrics>;

    /// Requests `url` without following redirects and returns the
    /// `Location` it points to, if any.
    async fn redirect_location(&self, url: &str) -> Result<Option<String>>;

    /// Searches songs by keywords.
    async fn search(&self, keywords: &str, page: u32) -> Result<Vec<TrackDetail>>;

    /// Lists the track IDs of a playlist in playlist order.
    async fn playlist_track_ids(&self, id: u64) -> Result<Vec<TrackId>>;

    /// Lists the first page of playlists created or subscribed by a user.
    async fn user_playlists(&self, uid: u64) -> Result<Vec<PlaylistSummary>>;

    /// Lists the most popular playlists across all categories.
    async fn hot_playlists(&self) -> Result<Vec<PlaylistSummary>>;
}

/// Catalog client backed by the vendor's HTTP API.
pub struct Catalog {
    http_client: HttpClient,
    cipher: Cipher,

    /// Replaces scheme, host and port of every endpoint when set.
    base_url: Option<Url>,
}

impl Catalog {
    /// The URL of the cookie origin.
    ///
    /// Cookies are set for the whole `music.163.com` domain so that they
    /// also reach `interface3.music.163.com`.
    const COOKIE_ORIGIN: &'static str = "https://music.163.com";

    const COOKIE_DOMAIN: &'static str = "music.163.com";

    /// Cookies the desktop client sends with every request.
    const DEFAULT_COOKIES: [(&'static str, &'static str); 4] = [
        ("os", "pc"),
        ("appver", ""),
        ("osver", ""),
        ("deviceId", "pyncm!"),
    ];

    /// `Referer` expected by the catalog endpoints.
    const WEB_REFERER: HeaderValue = HeaderValue::from_static("https://music.163.com/");

    /// The cookie origin as a `reqwest::Url`.
    ///
    /// # Panics
    ///
    /// Will panic if the URL is invalid.
    fn cookie_origin() -> Url {
        Url::parse(Self::COOKIE_ORIGIN).expect("invalid cookie origin")
    }

    /// Creates a new `reqwest::cookie::Jar` with the default cookies
    /// followed by those of the session credential.
    fn cookie_jar(config: &Config) -> reqwest::cookie::Jar {
        let cookie_jar = reqwest::cookie::Jar::default();
        let cookie_origin = Self::cookie_origin();

        let mut pairs: Vec<(&str, &str)> = Self::DEFAULT_COOKIES.to_vec();
        pairs.extend(config.credential.pairs());
        for (name, value) in pairs {
            let cookie = format!("{name}={value}; Domain={}; Path=/", Self::COOKIE_DOMAIN);
            cookie_jar.add_cookie_str(&cookie, &cookie_origin);
        }

        cookie_jar
    }

    /// Creates a catalog client.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let cookie_jar = Self::cookie_jar(config);
        let http_client = HttpClient::with_cookies(config, cookie_jar)?;

        Ok(Self {
            http_client,
            cipher: Cipher::new(config.cipher_key),
            base_url: None,
        })
    }

    /// Creates a catalog client that sends every request to `base_url`
    /// instead of the vendor hosts, keeping the endpoint paths.
    ///
    /// Cookies stay scoped to the vendor domain and are not sent to
    /// `base_url`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client cannot be built.
    pub fn with_base_url(config: &Config, base_url: Url) -> Result<Self> {
        debug!("sending catalog requests to {base_url}");
        Ok(Self {
            base_url: Some(base_url),
            ..Self::new(config)?
        })
    }

    /// The `Cookie` header value sent to the catalog.
    #[must_use]
    pub fn cookies(&self) -> Option<HeaderValue> {
        self.http_client
            .cookie_jar
            .as_ref()
            .and_then(|jar| jar.cookies(&Self::cookie_origin()))
    }

    /// Parses an endpoint URL, rebased onto `base_url` if one is set.
    fn endpoint(&self, url: &str) -> Result<Url> {
        let url = Url::parse(url)?;
        match self.base_url {
            Some(ref base_url) => {
                let mut rebased = base_url.join(url.path())?;
                rebased.set_query(url.query());
                Ok(rebased)
            }
            None => Ok(url),
        }
    }

    /// Builds the encrypted stream URL request.
    fn stream_url_request(&self, id: TrackId, quality: StreamQuality) -> Result<reqwest::Request> {
        let url = self.endpoint(song_url::Request::URL)?;
        let payload = song_url::Request::new(id, quality)?;
        let params = self.cipher.encrypt(url.path(), &payload)?;

        Ok(self.http_client.post_form(url, [("params", params)]))
    }

    /// Builds the batched detail request.
    fn details_request(&self, ids: &[TrackId]) -> Result<reqwest::Request> {
        let payload: song_detail::Request = ids.iter().copied().collect();
        let field = serde_json::to_string(&payload).map_err(Error::internal)?;

        self.web_form(song_detail::Request::URL, [(song_detail::Request::FIELD, field)])
    }

    /// Builds the lyric request.
    fn lyric_request(&self, id: TrackId) -> Result<reqwest::Request> {
        self.web_form(lyric::Request::URL, lyric::Request { id }.form())
    }

    /// Builds a form POST to a plain endpoint.
    fn web_form<I, K, V>(&self, url: &str, fields: I) -> Result<reqwest::Request>
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = self.endpoint(url)?;
        let mut request = self.http_client.post_form(url, fields);
        request.headers_mut().insert(REFERER, Self::WEB_REFERER);

        Ok(request)
    }

    /// Builds a GET request to a web endpoint.
    fn web_request<I, K, V>(&self, url: &str, query: I) -> Result<reqwest::Request>
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = self.endpoint(url)?;
        url.query_pairs_mut().extend_pairs(query);

        let mut request = self.http_client.get(url);
        request.headers_mut().insert(REFERER, Self::WEB_REFERER);

        Ok(request)
    }

    /// Executes `request` and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Will return `Err` if:
    /// - the HTTP request fails or times out
    /// - the HTTP status is not a success
    /// - the body is not the expected JSON
    async fn send<T>(&self, request: reqwest::Request) -> Result<T>
    where
        T: std::fmt::Debug + DeserializeOwned,
    {
        let url = request.url().path().to_owned();

        let response = self.http_client.execute(request).await?;
        let body = response.error_for_status()?.bytes().await?;
        let result = serde_json::from_slice::<T>(&body)?;
        trace!("{url}: {result:#?}");

        Ok(result)
    }
}

#[async_trait]
impl CatalogApi for Catalog {
    async fn stream_url(&self, id: TrackId, quality: StreamQuality) -> Result<(Stream, String)> {
        let request = self.stream_url_request(id, quality)?;
        let response: song_url::Response = self.send(request).await?;
        let (stream, url) = response.into_stream()?;

        debug!(
            "track {id}: {} stream of {} bytes at {} bps",
            stream.level, stream.size, stream.bitrate
        );

        Ok((stream, url))
    }

    async fn details(&self, ids: &[TrackId]) -> Result<Vec<TrackDetail>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.details_request(ids)?;
        let response: song_detail::Response = self.send(request).await?;
        response.status.check()?;

        Ok(response.songs().map(TrackDetail::from).collect())
    }

    async fn lyric(&self, id: TrackId) -> Result<Lyrics> {
        let request = self.lyric_request(id)?;
        let response: lyric::Response = self.send(request).await?;
        response.status.check()?;

        Ok(Lyrics::from(response))
    }

    async fn redirect_location(&self, url: &str) -> Result<Option<String>> {
        let url = url.trim();
        let url = if url.contains("://") {
            Url::parse(url)?
        } else {
            Url::parse(&format!("https://{url}"))?
        };

        self.http_client.location(url).await
    }

    async fn search(&self, keywords: &str, page: u32) -> Result<Vec<TrackDetail>> {
        let query = search::Request {
            keywords: keywords.to_owned(),
            page,
        }
        .query();
        let request = self.web_request(search::Request::URL, query)?;
        let response: search::Response = self.send(request).await?;
        response.status.check()?;

        Ok(response
            .result
            .map(|result| result.songs.into_iter().map(TrackDetail::from).collect())
            .unwrap_or_default())
    }

    async fn playlist_track_ids(&self, id: u64) -> Result<Vec<TrackId>> {
        let query = playlist::Request { id }.query();
        let request = self.web_request(playlist::Request::URL, query)?;
        let response: playlist::Response = self.send(request).await?;
        response.status.check()?;

        let playlist = response
            .result
            .ok_or_else(|| Error::bad_response(format!("no playlist {id}")))?;
        debug!("playlist {id} \"{}\"", playlist.name);

        Ok(playlist.track_ids())
    }

    async fn user_playlists(&self, uid: u64) -> Result<Vec<PlaylistSummary>> {
        let query = user_playlists::Request { uid }.query();
        let request = self.web_request(user_playlists::Request::URL, query)?;
        let response: user_playlists::Response = self.send(request).await?;
        response.status.check()?;

        debug!("user {uid} has {} playlists", response.playlist.len());
        Ok(response
            .playlist
            .into_iter()
            .map(PlaylistSummary::from)
            .collect())
    }

    async fn hot_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let request = self.web_request(hot_playlists::Request::URL, hot_playlists::Request.query())?;
        let response: hot_playlists::Response = self.send(request).await?;
        response.status.check()?;

        Ok(response
            .into_playlists()
            .into_iter()
            .map(PlaylistSummary::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::cookie::CookieStore;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::{credential::Credential, eapi, error::ErrorKind};

    fn config() -> Config {
        Config::with_credential("MUSIC_U=secret; __csrf=token".parse::<Credential>().unwrap())
    }

    fn track(id: u64) -> TrackId {
        TrackId::try_from(id).unwrap()
    }

    /// Starts a local server answering every lyric request with `response`.
    async fn serve_lyric(config: &Config, response: ResponseTemplate) -> (MockServer, Catalog) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/song/lyric"))
            .respond_with(response)
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let catalog = Catalog::with_base_url(config, base).unwrap();
        (server, catalog)
    }

    fn body(request: &reqwest::Request) -> &str {
        let bytes = request.body().and_then(reqwest::Body::as_bytes).unwrap();
        std::str::from_utf8(bytes).unwrap()
    }

    #[test]
    fn cookies_include_defaults_and_credential() {
        let catalog = Catalog::new(&config()).unwrap();
        let cookies = catalog.cookies().unwrap();
        let cookies = cookies.to_str().unwrap();

        for expected in ["os=pc", "deviceId=pyncm!", "MUSIC_U=secret", "__csrf=token"] {
            assert!(cookies.contains(expected), "{expected} missing in {cookies}");
        }

        let jar = Catalog::cookie_jar(&config());
        let interface = Url::parse("https://interface3.music.163.com/api/song/lyric").unwrap();
        assert!(jar.cookies(&interface).is_some());
    }

    #[test]
    fn stream_url_request_is_encrypted() {
        let catalog = Catalog::new(&config()).unwrap();
        let id = TrackId::try_from(2_053_369_738_u64).unwrap();
        let request = catalog
            .stream_url_request(id, StreamQuality::Lossless)
            .unwrap();

        assert_eq!(request.url().as_str(), song_url::Request::URL);
        let params = body(&request).strip_prefix("params=").unwrap();
        assert!(params.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));

        let signing = Cipher::new(eapi::Key::default()).decrypt(params).unwrap();
        assert!(signing.starts_with(
            r#"/api/song/enhance/player/url/v1-36cd479b6b5-{"ids":["2053369738"],"level":"lossless","encodeType":"flac""#
        ));
    }

    #[test]
    fn details_request_uses_c_field() {
        let catalog = Catalog::new(&config()).unwrap();
        let ids = [1_u64, 2].map(|id| TrackId::try_from(id).unwrap());
        let request = catalog.details_request(&ids).unwrap();

        let form: Vec<(String, String)> = url::form_urlencoded::parse(body(&request).as_bytes())
            .into_owned()
            .collect();
        assert_eq!(
            form,
            [(
                "c".to_owned(),
                r#"[{"id":"1","v":0},{"id":"2","v":0}]"#.to_owned()
            )]
        );
        assert_eq!(request.headers()[REFERER], "https://music.163.com/");
    }

    #[test]
    fn lyric_request_carries_referer() {
        let catalog = Catalog::new(&config()).unwrap();
        let request = catalog.lyric_request(track(42)).unwrap();

        assert_eq!(request.url().as_str(), lyric::Request::URL);
        assert_eq!(request.headers()[REFERER], "https://music.163.com/");
        assert!(body(&request).starts_with("id=42&"));
    }

    #[test]
    fn base_url_keeps_endpoint_paths() {
        let base = Url::parse("http://127.0.0.1:8080").unwrap();
        let catalog = Catalog::with_base_url(&config(), base).unwrap();

        let request = catalog
            .stream_url_request(track(1), StreamQuality::Standard)
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:8080/eapi/song/enhance/player/url/v1"
        );

        let signing = Cipher::new(eapi::Key::default())
            .decrypt(body(&request).strip_prefix("params=").unwrap())
            .unwrap();
        assert!(signing.starts_with("/api/song/enhance/player/url/v1-36cd479b6b5-"));

        let request = catalog
            .web_request(user_playlists::Request::URL, user_playlists::Request { uid: 7 }.query())
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://127.0.0.1:8080/api/user/playlist/?offset=0&limit=100&uid=7"
        );
    }

    #[test]
    fn web_requests_carry_referer() {
        let catalog = Catalog::new(&config()).unwrap();
        let query = search::Request {
            keywords: "a b".to_owned(),
            page: 1,
        }
        .query();
        let request = catalog.web_request(search::Request::URL, query).unwrap();

        assert_eq!(request.headers()[REFERER], "https://music.163.com/");
        assert_eq!(
            request.url().query(),
            Some("s=a+b&type=1&limit=30&offset=50")
        );
    }

    #[tokio::test]
    async fn slow_upstream_is_a_timeout() {
        let mut config = config();
        config.request_timeout = Duration::from_millis(100);
        let slow = ResponseTemplate::new(200)
            .set_body_json(json!({"code": 200}))
            .set_delay(Duration::from_secs(5));
        let (_server, catalog) = serve_lyric(&config, slow).await;

        let err = catalog.lyric(track(1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamTimeout);
    }

    #[tokio::test]
    async fn server_error_is_an_http_error() {
        let (_server, catalog) = serve_lyric(&config(), ResponseTemplate::new(503)).await;

        let err = catalog.lyric(track(1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamHttpError);
    }

    #[tokio::test]
    async fn non_json_body_is_a_bad_response() {
        let html = ResponseTemplate::new(200).set_body_string("<html>busy</html>");
        let (_server, catalog) = serve_lyric(&config(), html).await;

        let err = catalog.lyric(track(1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamBadResponse);
    }

    #[tokio::test]
    async fn vendor_failure_code_is_a_bad_response() {
        let refused =
            ResponseTemplate::new(200).set_body_json(json!({"code": -460, "message": "cheating"}));
        let (_server, catalog) = serve_lyric(&config(), refused).await;

        let err = catalog.lyric(track(1)).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamBadResponse);
        assert_eq!(err.error.to_string(), "vendor code -460: cheating");
    }

    #[tokio::test]
    async fn lyric_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/song/lyric"))
            .and(header("referer", "https://music.163.com/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "lrc": {"lyric": "[00:01.00]hello"},
                "tlyric": {"lyric": null}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let catalog = Catalog::with_base_url(&config(), base).unwrap();
        let lyrics = catalog.lyric(track(1)).await.unwrap();
        assert_eq!(lyrics.lyric, "[00:01.00]hello");
        assert!(lyrics.translated_lyric.is_empty());
    }

    #[tokio::test]
    async fn lists_user_and_hot_playlists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/playlist/"))
            .and(query_param("uid", "32953014"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "playlist": [
                    {"id": 5, "name": "Liked", "trackCount": 12, "creator": {"nickname": "me"}},
                    {"id": 6, "name": "Road trip", "trackCount": 40}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/playlist/list"))
            .and(query_param("cat", "全部"))
            .and(query_param("order", "hot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "playlists": [{"id": 9, "name": "Hot", "coverImgUrl": "https://p1/h.jpg"}]
            })))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let catalog = Catalog::with_base_url(&config(), base).unwrap();

        let mine = catalog.user_playlists(32_953_014).await.unwrap();
        let ids: Vec<u64> = mine.iter().map(|playlist| playlist.id).collect();
        assert_eq!(ids, [5, 6]);
        assert_eq!(mine[0].creator, "me");
        assert_eq!(mine[1].track_count, 40);

        let hot = catalog.hot_playlists().await.unwrap();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].cover_url, "https://p1/h.jpg");
    }
}

//! Single-track resolution pipeline.
//!
//! Turns caller input into a [`ResolvedTrack`] in four steps:
//!
//! 1. Normalize the input into a track ID.
//! 2. Fetch a stream URL through the encrypted endpoint. The vendor answers
//!    with the ID it actually serves, which is used from here on.
//! 3. Fetch the detail and the lyrics concurrently.
//! 4. Assemble the record.
//!
//! Failures up to and including the detail lookup abort the resolution and
//! are tagged with the [`Stage`] they came from. Missing lyrics never do:
//! the record is returned with empty lyric fields instead.
//!
//! # State Machine
//!
//! ```text
//! Start -> IdentifierResolved -> StreamUrlObtained -> DetailObtained
//!       -> LyricAttempted -> Assembled
//! ```
//!
//! Any state before `DetailObtained` may move to `Failed`. Transitions are
//! logged at `trace` level, and [`Resolver::resolve_traced`] returns them.

use std::{fmt, time::Duration};

use crate::{
    batch::BatchLookup,
    catalog::{CatalogApi, Stream},
    config::Config,
    error::{Error, ErrorKind, Result, Stage},
    format, identifier,
    protocol::StreamQuality,
    track::{Lyrics, PlaylistSummary, ResolvedTrack, TrackDetail, TrackId},
};

/// Progress of one resolution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Start,
    IdentifierResolved(TrackId),
    StreamUrlObtained(TrackId),
    DetailObtained,
    LyricAttempted,
    Assembled,
    Failed { kind: ErrorKind, stage: Stage },
}

impl State {
    /// Whether no further transitions can happen.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Assembled | Self::Failed { .. })
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::IdentifierResolved(id) => write!(f, "identifier resolved ({id})"),
            Self::StreamUrlObtained(id) => write!(f, "stream url obtained ({id})"),
            Self::DetailObtained => write!(f, "detail obtained"),
            Self::LyricAttempted => write!(f, "lyric attempted"),
            Self::Assembled => write!(f, "assembled"),
            Self::Failed { kind, stage } => write!(f, "failed: {kind} at {stage}"),
        }
    }
}

/// Tracks and logs state transitions of one resolution.
#[derive(Debug)]
struct Pipeline {
    /// Every state entered so far, starting with `Start`.
    history: Vec<State>,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            history: vec![State::Start],
        }
    }

    fn state(&self) -> State {
        self.history.last().copied().unwrap_or(State::Start)
    }

    fn advance(&mut self, next: State) {
        trace!("{} -> {next}", self.state());
        self.history.push(next);
    }

    fn fail(&mut self, error: &Error) {
        // Identifier errors are raised before any stage is tagged.
        let stage = error.stage.unwrap_or(Stage::Identifier);
        self.advance(State::Failed {
            kind: error.kind,
            stage,
        });
    }
}

/// Resolves tracks against a catalog.
pub struct Resolver<C> {
    catalog: C,
    batch: BatchLookup,
}

impl<C> Resolver<C>
where
    C: CatalogApi,
{
    #[must_use]
    pub fn new(catalog: C, config: &Config) -> Self {
        Self {
            catalog,
            batch: BatchLookup::new(config.chunk_size, config.chunk_concurrency),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    #[must_use]
    pub fn batch(&self) -> &BatchLookup {
        &self.batch
    }

    /// Resolves `input` into a playable track at the requested quality.
    ///
    /// # Errors
    ///
    /// Returns an error tagged with the failing [`Stage`] if the input
    /// cannot be resolved, or if the stream URL or the detail cannot be
    /// fetched. Lyric failures are logged and not returned.
    pub async fn resolve(&self, input: &str, quality: StreamQuality) -> Result<ResolvedTrack> {
        self.resolve_traced(input, quality).await.0
    }

    /// Like [`Resolver::resolve`], but also returns every [`State`] the
    /// resolution went through. The last state is always terminal.
    pub async fn resolve_traced(
        &self,
        input: &str,
        quality: StreamQuality,
    ) -> (Result<ResolvedTrack>, Vec<State>) {
        let mut pipeline = Pipeline::new();

        let result = self.run(&mut pipeline, input, quality).await;
        if let Err(ref e) = result {
            pipeline.fail(e);
        }

        (result, pipeline.history)
    }

    /// Like [`Resolver::resolve`], but gives up after `deadline`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UpstreamTimeout` when the deadline expires, or any
    /// error of [`Resolver::resolve`].
    pub async fn resolve_with_deadline(
        &self,
        input: &str,
        quality: StreamQuality,
        deadline: Duration,
    ) -> Result<ResolvedTrack> {
        tokio::time::timeout(deadline, self.resolve(input, quality))
            .await
            .map_err(|_| {
                Error::upstream_timeout(format!(
                    "resolution did not finish within {}s",
                    deadline.as_secs_f32()
                ))
            })?
    }

    async fn run(
        &self,
        pipeline: &mut Pipeline,
        input: &str,
        quality: StreamQuality,
    ) -> Result<ResolvedTrack> {
        let id = identifier::resolve(&self.catalog, input)
            .await
            .map_err(|e| e.at(Stage::Identifier))?;
        pipeline.advance(State::IdentifierResolved(id));

        let (stream, stream_url) = self
            .catalog
            .stream_url(id, quality)
            .await
            .map_err(|e| e.at(Stage::StreamUrl))?;
        let confirmed = stream.id;
        if confirmed != id {
            debug!("track {id} is served as {confirmed}");
        }
        pipeline.advance(State::StreamUrlObtained(confirmed));

        let (detail, lyrics) = tokio::join!(
            self.catalog.detail(confirmed),
            self.catalog.lyric(confirmed)
        );

        let detail = detail.map_err(|e| e.at(Stage::Detail))?;
        pipeline.advance(State::DetailObtained);

        let lyrics = lyrics.unwrap_or_else(|e| {
            let e = Error::partial_data(e).at(Stage::Lyric);
            warn!("track {confirmed}: {e}");
            Lyrics::default()
        });
        pipeline.advance(State::LyricAttempted);

        let track = assemble(detail, stream, stream_url, lyrics, quality);
        pipeline.advance(State::Assembled);

        Ok(track)
    }

    /// Looks up only the stream of a track.
    ///
    /// # Errors
    ///
    /// Returns an error tagged with `Stage::StreamUrl` if no stream is
    /// available.
    pub async fn stream(&self, id: TrackId, quality: StreamQuality) -> Result<(Stream, String)> {
        self.catalog
            .stream_url(id, quality)
            .await
            .map_err(|e| e.at(Stage::StreamUrl))
    }

    /// Looks up the lyrics of a track.
    ///
    /// # Errors
    ///
    /// Returns `Error::PartialDataUnavailable` if the track has neither
    /// original nor translated lyrics, or the upstream error if the lookup
    /// fails.
    pub async fn lyric(&self, id: TrackId) -> Result<Lyrics> {
        let lyrics = self
            .catalog
            .lyric(id)
            .await
            .map_err(|e| e.at(Stage::Lyric))?;

        if lyrics.is_empty() {
            return Err(Error::partial_data(format!("no lyrics for track {id}")).at(Stage::Lyric));
        }

        Ok(lyrics)
    }

    /// Looks up the cover art URL of a track.
    ///
    /// Returns an empty string if the track has no cover or the lookup
    /// fails.
    pub async fn cover(&self, id: TrackId) -> String {
        match self.catalog.detail(id).await {
            Ok(detail) => detail.cover_url,
            Err(e) => {
                warn!("no cover for track {id}: {e}");
                String::new()
            }
        }
    }

    /// Searches songs by keywords. Pages start at `0`.
    ///
    /// # Errors
    ///
    /// Returns the upstream error if the search fails.
    pub async fn search(&self, keywords: &str, page: u32) -> Result<Vec<TrackDetail>> {
        let keywords = keywords.trim();
        if keywords.is_empty() {
            return Err(Error::invalid_argument("search keywords are empty"));
        }

        self.catalog.search(keywords, page).await
    }

    /// Lists the tracks of a playlist in playlist order.
    ///
    /// Tracks without detail are replaced by placeholders.
    ///
    /// # Errors
    ///
    /// Returns the upstream error if the playlist cannot be fetched.
    /// Failing detail lookups are not errors.
    pub async fn playlist(&self, id: u64) -> Result<Vec<TrackDetail>> {
        let ids = self.catalog.playlist_track_ids(id).await?;
        let details = self.batch.lookup(&self.catalog, &ids).await;

        Ok(details.enrich(&ids))
    }

    /// Lists the playlists of a user.
    ///
    /// # Errors
    ///
    /// Returns the upstream error if the listing fails.
    pub async fn user_playlists(&self, uid: u64) -> Result<Vec<PlaylistSummary>> {
        if uid == 0 {
            return Err(Error::invalid_argument("user id must not be zero"));
        }

        self.catalog.user_playlists(uid).await
    }

    /// Lists the most popular playlists.
    ///
    /// # Errors
    ///
    /// Returns the upstream error if the listing fails.
    pub async fn hot_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        self.catalog.hot_playlists().await
    }
}

/// Merges the partial results of one resolution.
fn assemble(
    detail: TrackDetail,
    stream: Stream,
    stream_url: String,
    lyrics: Lyrics,
    requested: StreamQuality,
) -> ResolvedTrack {
    // The vendor may serve a lower tier than requested.
    let level = if stream.level.is_empty() {
        requested.code()
    } else {
        stream.level.as_str()
    };

    ResolvedTrack {
        id: detail.id,
        title: detail.title,
        cover_url: detail.cover_url,
        artist: detail.artist,
        album: detail.album,
        quality_label: format::quality_label(level).to_owned(),
        size_label: format::size_label(stream.size),
        stream_url,
        bitrate: stream.bitrate,
        encode_type: stream.encode_type,
        lyric: lyrics.lyric,
        translated_lyric: lyrics.translated_lyric,
    }
}

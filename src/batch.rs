//! Chunked detail lookup for lists of tracks.
//!
//! Playlists and history views need metadata of hundreds of tracks. The
//! detail endpoint accepts many IDs per request, but not arbitrarily many,
//! so the list is split into chunks that are looked up concurrently.
//!
//! A chunk that fails contributes nothing to the result and does not affect
//! the other chunks. Callers that need a record for every ID use
//! [`BatchDetailResult::enrich`] to fill the holes with placeholders.

use std::{collections::HashMap, time::Duration};

use futures_util::{stream, Stream, StreamExt};

use crate::{
    catalog::CatalogApi,
    config::Config,
    track::{TrackDetail, TrackId},
};

/// Details found by a batch lookup, keyed by track ID.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchDetailResult {
    details: HashMap<TrackId, TrackDetail>,
}

impl BatchDetailResult {
    #[must_use]
    pub fn get(&self, id: TrackId) -> Option<&TrackDetail> {
        self.details.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: TrackId) -> bool {
        self.details.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.details.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TrackId, &TrackDetail)> {
        self.details.iter()
    }

    /// Walks `ids` in order and returns one record per ID, substituting a
    /// placeholder for every ID without details.
    #[must_use]
    pub fn enrich(&self, ids: &[TrackId]) -> Vec<TrackDetail> {
        ids.iter()
            .map(|&id| {
                self.details
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| TrackDetail::placeholder(id))
            })
            .collect()
    }
}

impl Extend<TrackDetail> for BatchDetailResult {
    fn extend<I: IntoIterator<Item = TrackDetail>>(&mut self, iter: I) {
        self.details
            .extend(iter.into_iter().map(|detail| (detail.id, detail)));
    }
}

impl IntoIterator for BatchDetailResult {
    type Item = (TrackId, TrackDetail);
    type IntoIter = std::collections::hash_map::IntoIter<TrackId, TrackDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.details.into_iter()
    }
}

/// Splits ID lists into chunks and looks them up concurrently.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BatchLookup {
    chunk_size: usize,
    concurrency: usize,
}

impl Default for BatchLookup {
    fn default() -> Self {
        Self::new(Config::DEFAULT_CHUNK_SIZE, Config::DEFAULT_CHUNK_CONCURRENCY)
    }
}

impl BatchLookup {
    /// Creates a lookup with `chunk_size` IDs per request and at most
    /// `concurrency` requests in flight. Zero values are raised to one.
    #[must_use]
    pub fn new(chunk_size: usize, concurrency: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Looks up the details of `ids`.
    ///
    /// IDs the vendor does not know, and IDs in chunks that failed, are
    /// missing from the result.
    pub async fn lookup<C>(&self, catalog: &C, ids: &[TrackId]) -> BatchDetailResult
    where
        C: CatalogApi + ?Sized,
    {
        let mut result = BatchDetailResult::default();
        self.collect(catalog, ids, &mut result).await;
        result
    }

    /// Like [`BatchLookup::lookup`], but returns whatever was collected
    /// when `deadline` expires.
    pub async fn lookup_with_deadline<C>(
        &self,
        catalog: &C,
        ids: &[TrackId],
        deadline: Duration,
    ) -> BatchDetailResult
    where
        C: CatalogApi + ?Sized,
    {
        let mut result = BatchDetailResult::default();

        let collect = self.collect(catalog, ids, &mut result);
        if tokio::time::timeout(deadline, collect).await.is_err() {
            warn!(
                "batch lookup of {} tracks did not finish within {}s",
                ids.len(),
                deadline.as_secs_f32()
            );
        }

        debug!("batch lookup found {} of {} tracks", result.len(), ids.len());
        result
    }

    async fn collect<C>(&self, catalog: &C, ids: &[TrackId], result: &mut BatchDetailResult)
    where
        C: CatalogApi + ?Sized,
    {
        let mut chunks = self.chunks(catalog, ids);
        while let Some(details) = chunks.next().await {
            result.extend(details);
        }
    }

    /// Stream of the details of each chunk, in completion order.
    fn chunks<'a, C>(
        &'a self,
        catalog: &'a C,
        ids: &'a [TrackId],
    ) -> impl Stream<Item = Vec<TrackDetail>> + 'a
    where
        C: CatalogApi + ?Sized,
    {
        stream::iter(ids.chunks(self.chunk_size).enumerate())
            .map(move |(index, chunk)| async move {
                match catalog.details(chunk).await {
                    Ok(details) => {
                        trace!("chunk {index}: {} of {} tracks", details.len(), chunk.len());
                        details
                    }
                    Err(e) => {
                        warn!("chunk {index} of {} tracks failed: {e}", chunk.len());
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(self.concurrency)
    }
}

//! Album → feed pipeline.
//!
//! - [`album`] - album metadata, cached per album id
//! - [`tracks`] - track listing with concurrent, order-preserving pagination
//! - [`description`] - per-track description with optional rich show-notes
//! - [`paid`] - authorized play URLs for premium tracks
//! - [`assemble`] - pure mapping to feed items
//!
//! [`AlbumFeedBuilder`] runs them in that order for one [`FeedRequest`].

mod album;
mod assemble;
mod description;
mod error;
mod paid;
mod tracks;
mod types;

use std::collections::HashMap;
use std::future::Future;
use std::pin::pin;

use futures::stream::{self, StreamExt};
use secrecy::SecretString;
use serde::Deserialize;

use crate::cache::FeedCache;
use crate::feed::{Feed, FeedRequest};
use crate::platform::PlatformClient;

pub use album::AlbumMetadataResolver;
pub use assemble::{CategoryTable, FeedItemAssembler, ENCLOSURE_MIME_TYPE, RESTRICTED_MARKER};
pub use description::TrackDescriptionCache;
pub use error::{ErrorKind, FeedError};
pub use paid::{PaidBatch, PaidCacheKey, PaidContentResolver};
pub use tracks::{TrackListPaginator, DEFAULT_PAGE_SIZE, FULL_PAGE_SIZE};
pub use types::{
    merge_enrichment, Album, EnrichedTrack, PagedTrackBatch, PaidResolution, SkippedTrack, Track,
    TrackId,
};

/// Upper bound on in-flight requests in any one fan-out.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// What a per-track failure does to the rest of the album.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Any track failing fails the whole build.
    #[default]
    Abort,
    /// Failed tracks are left out and reported in [`BuildOutcome::skipped`].
    Skip,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub page_size: u32,
    pub full_page_size: u32,
    pub max_concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub paid_cache_key: PaidCacheKey,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            full_page_size: FULL_PAGE_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            failure_policy: FailurePolicy::default(),
            paid_cache_key: PaidCacheKey::default(),
        }
    }
}

/// A built feed plus the tracks the skip policy left out of it.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub feed: Feed,
    pub skipped: Vec<SkippedTrack>,
}

/// Builds one album's feed from the platform.
///
/// Caches are shared through the [`FeedCache`] handed in, so builders (and
/// repeated builds) over the same cache reuse each other's results.
pub struct AlbumFeedBuilder {
    albums: AlbumMetadataResolver,
    paginator: TrackListPaginator,
    descriptions: TrackDescriptionCache,
    paid: Option<PaidContentResolver>,
    assembler: FeedItemAssembler,
    max_concurrency: usize,
    failure_policy: FailurePolicy,
}

impl AlbumFeedBuilder {
    /// Paid resolution is only available when `credential` is set.
    pub fn new(
        client: PlatformClient,
        cache: &FeedCache,
        options: BuildOptions,
        categories: CategoryTable,
        credential: Option<SecretString>,
    ) -> Self {
        let max_concurrency = options.max_concurrency.max(1);
        let assembler = FeedItemAssembler::new(&client.endpoints().site, categories);

        Self {
            albums: AlbumMetadataResolver::new(client.clone(), cache.albums.clone()),
            paginator: TrackListPaginator::new(client.clone())
                .with_page_sizes(options.page_size, options.full_page_size)
                .with_max_concurrency(max_concurrency),
            descriptions: TrackDescriptionCache::new(client.clone(), cache.descriptions.clone()),
            paid: credential.map(|credential| {
                PaidContentResolver::new(client, cache.play_info.clone(), credential)
                    .with_cache_key(options.paid_cache_key)
            }),
            assembler,
            max_concurrency,
            failure_policy: options.failure_policy,
        }
    }

    /// Runs the pipeline for `request`.
    ///
    /// # Errors
    ///
    /// - [`FeedError::NotFound`] when the album does not exist
    /// - [`FeedError::Transport`] when metadata or any track page fails, or
    ///   when any per-track call fails under [`FailurePolicy::Abort`]
    pub async fn build(&self, request: &FeedRequest) -> Result<BuildOutcome, FeedError> {
        let album = self.albums.resolve(&request.album_id).await?;
        let tracks = self
            .paginator
            .collect(&request.album_id, request.fetch_all)
            .await?;

        let mut skipped = Vec::new();

        let mut descriptions = self
            .enrich(
                "description",
                tracks.iter(),
                |track| self.descriptions.describe(track, request.show_note),
                &mut skipped,
            )
            .await?;

        let paid = match (&self.paid, album.is_paid) {
            (Some(resolver), true) => {
                let batch = resolver.batch();
                tracing::debug!(
                    album_id = %album.id,
                    session = %batch.session(),
                    "Resolving paid play URLs"
                );
                let pending = tracks.iter().filter(|t| descriptions.contains_key(&t.id));
                let paid = self
                    .enrich("paid", pending, |track| batch.resolve(track.id), &mut skipped)
                    .await?;
                for failed in skipped.iter().filter(|s| s.stage == "paid") {
                    descriptions.remove(&failed.track_id);
                }
                paid
            }
            (None, true) => {
                tracing::debug!(album_id = %album.id, "Paid album but no credential configured");
                HashMap::new()
            }
            (_, false) => HashMap::new(),
        };

        let enriched = merge_enrichment(tracks, descriptions, paid);
        let feed = self.assembler.assemble(request, &album, &enriched);

        tracing::info!(
            album_id = %album.id,
            items = feed.items.len(),
            skipped = skipped.len(),
            paid = album.is_paid,
            "Built album feed"
        );

        Ok(BuildOutcome { feed, skipped })
    }

    /// Runs `work` for every track with at most `max_concurrency` in flight.
    ///
    /// Under [`FailurePolicy::Abort`] the first error is returned and the
    /// in-flight calls are dropped.
    async fn enrich<'a, T, F, Fut>(
        &self,
        stage: &'static str,
        tracks: impl Iterator<Item = &'a Track>,
        work: F,
        skipped: &mut Vec<SkippedTrack>,
    ) -> Result<HashMap<TrackId, T>, FeedError>
    where
        F: Fn(&'a Track) -> Fut,
        Fut: Future<Output = Result<T, FeedError>>,
    {
        let mut results = pin!(stream::iter(tracks)
            .map(|track| {
                let track_id = track.id;
                let call = work(track);
                async move { (track_id, call.await) }
            })
            .buffered(self.max_concurrency));

        let mut settled = HashMap::new();
        while let Some((track_id, result)) = results.next().await {
            match result {
                Ok(value) => {
                    settled.insert(track_id, value);
                }
                Err(e) if self.failure_policy == FailurePolicy::Abort => return Err(e),
                Err(e) => {
                    tracing::warn!(track_id = track_id, stage = stage, error = %e, "Skipping track");
                    skipped.push(SkippedTrack {
                        track_id,
                        stage,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(settled)
    }
}

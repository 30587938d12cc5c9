use futures::stream::{self, StreamExt, TryStreamExt};

use crate::platform::PlatformClient;

use super::error::FeedError;
use super::types::{PagedTrackBatch, Track};

/// Page size for the default, first-page-only listing.
pub const DEFAULT_PAGE_SIZE: u32 = 30;
/// Page size used when the whole album is requested.
pub const FULL_PAGE_SIZE: u32 = 200;

/// Album track listing, merged across pages.
pub struct TrackListPaginator {
    client: PlatformClient,
    page_size: u32,
    full_page_size: u32,
    max_concurrency: usize,
}

impl TrackListPaginator {
    pub fn new(client: PlatformClient) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
            full_page_size: FULL_PAGE_SIZE,
            max_concurrency: super::DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_page_sizes(mut self, page_size: u32, full_page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self.full_page_size = full_page_size.max(1);
        self
    }

    /// Maximum page requests in flight at once.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub async fn fetch_page(
        &self,
        album_id: &str,
        page_size: u32,
        page_id: u32,
    ) -> Result<PagedTrackBatch, FeedError> {
        let data = self
            .client
            .fetch_track_page(album_id, page_size, page_id)
            .await?;

        tracing::debug!(
            album_id = %album_id,
            page_id = page_id,
            max_page_id = data.max_page_id,
            tracks = data.list.len(),
            "Fetched track page"
        );

        Ok(PagedTrackBatch {
            page_id: data.page_id.unwrap_or(page_id),
            max_page_id: data.max_page_id,
            tracks: data.list.into_iter().map(Track::from).collect(),
        })
    }

    /// Returns the album's tracks in platform order.
    ///
    /// Without `fetch_all` only page 1 is returned. With it, pages
    /// `2..=maxPageId` (as reported by page 1) are fetched concurrently and
    /// appended in ascending page order, whatever order they complete in.
    ///
    /// # Errors
    ///
    /// Any page failing fails the whole listing; no partial list is returned.
    pub async fn collect(&self, album_id: &str, fetch_all: bool) -> Result<Vec<Track>, FeedError> {
        let page_size = if fetch_all {
            self.full_page_size
        } else {
            self.page_size
        };

        let first = self.fetch_page(album_id, page_size, 1).await?;
        let max_page_id = first.max_page_id;
        let mut tracks = first.tracks;

        if !fetch_all || max_page_id <= 1 {
            return Ok(tracks);
        }

        // `buffered` yields in input order, so the merge is by page index.
        let rest: Vec<PagedTrackBatch> = stream::iter(2..=max_page_id)
            .map(|page_id| self.fetch_page(album_id, page_size, page_id))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        for batch in rest {
            tracks.extend(batch.tracks);
        }

        tracing::debug!(
            album_id = %album_id,
            pages = max_page_id,
            tracks = tracks.len(),
            "Merged album track pages"
        );

        Ok(tracks)
    }
}

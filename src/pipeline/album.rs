use crate::cache::ResolveCache;
use crate::platform::{PlatformClient, PlatformError};

use super::error::FeedError;
use super::types::Album;

/// Album metadata, read through the album cache.
pub struct AlbumMetadataResolver {
    client: PlatformClient,
    cache: ResolveCache<String, Album>,
}

impl AlbumMetadataResolver {
    pub fn new(client: PlatformClient, cache: ResolveCache<String, Album>) -> Self {
        Self { client, cache }
    }

    /// Returns the album snapshot, fetching it on a cache miss.
    ///
    /// # Errors
    ///
    /// - [`FeedError::NotFound`] when the platform has no such album
    /// - [`FeedError::Transport`] on any network or decoding failure
    pub async fn resolve(&self, album_id: &str) -> Result<Album, FeedError> {
        self.cache
            .resolve(album_id.to_string(), self.fetch(album_id))
            .await
            .map_err(FeedError::from)
    }

    async fn fetch(&self, album_id: &str) -> Result<Album, FeedError> {
        tracing::debug!(album_id = %album_id, "Album metadata cache miss, fetching");

        let envelope = match self.client.fetch_album(album_id).await {
            Ok(envelope) => envelope,
            Err(PlatformError::HttpStatus(404)) => {
                return Err(FeedError::NotFound(album_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let info = envelope
            .data
            .and_then(|data| data.album_page_main_info)
            .ok_or_else(|| FeedError::NotFound(album_id.to_string()))?;

        Ok(Album::from_main_info(album_id, info))
    }
}

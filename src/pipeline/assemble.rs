use std::collections::HashMap;

use url::Url;

use crate::feed::{Enclosure, Feed, FeedItem, FeedRequest};
use crate::util::{absolute_url, timestamp_from_millis};

use super::types::{Album, EnrichedTrack};

/// Prefixed to the description of items a listener may not be able to play.
pub const RESTRICTED_MARKER: &str = "[该内容需付费] ";

/// Every enclosure is AAC in an MP4 container.
pub const ENCLOSURE_MIME_TYPE: &str = "audio/x-m4a";

/// Platform category name → Apple Podcasts category.
const BUILTIN_CATEGORIES: &[(&str, &str)] = &[
    ("人文", "Society & Culture"),
    ("历史", "History"),
    ("头条", "News"),
    ("娱乐", "Leisure"),
    ("音乐", "Music"),
    ("IT科技", "Technology"),
];

/// Immutable category translation table. Unmapped names pass through.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    entries: HashMap<String, String>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            entries: BUILTIN_CATEGORIES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl CategoryTable {
    /// Built-in table with `overrides` added on top (overrides win).
    pub fn with_overrides<I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = Self::default();
        table.entries.extend(overrides);
        table
    }

    pub fn translate<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Maps album metadata and enriched tracks to feed items. No I/O.
#[derive(Debug, Clone)]
pub struct FeedItemAssembler {
    site_url: String,
    categories: CategoryTable,
}

impl FeedItemAssembler {
    pub fn new(site_url: &Url, categories: CategoryTable) -> Self {
        Self {
            site_url: site_url.as_str().trim_end_matches('/').to_string(),
            categories,
        }
    }

    pub fn assemble(&self, request: &FeedRequest, album: &Album, tracks: &[EnrichedTrack]) -> Feed {
        Feed {
            title: album.title.clone(),
            link: format!(
                "{}/{}/{}",
                self.site_url, request.album_type, request.album_id
            ),
            description: album.intro.clone(),
            image: album.cover_url.clone(),
            author: album.author.clone(),
            category: self.categories.translate(&album.category).to_string(),
            items: tracks.iter().map(|t| self.assemble_item(album, t)).collect(),
        }
    }

    /// Builds one item.
    ///
    /// Enclosure preference: decrypted paid URL, then the public high-quality
    /// URL, then the public low-quality one. The restricted marker is added
    /// when no enclosure was found or the album is paid; the two conditions
    /// are independent.
    pub fn assemble_item(&self, album: &Album, enriched: &EnrichedTrack) -> FeedItem {
        let track = &enriched.track;

        let enclosure = enriched
            .resolved_play_url
            .as_ref()
            .or(track.play_url_high.as_ref())
            .or(track.play_url_low.as_ref())
            .filter(|url| !url.is_empty())
            .map(|url| Enclosure {
                url: url.clone(),
                mime_type: ENCLOSURE_MIME_TYPE,
                duration_secs: track.duration_secs,
            });

        let description = if enclosure.is_none() || album.is_paid {
            format!("{RESTRICTED_MARKER}{}", enriched.description)
        } else {
            enriched.description.clone()
        };

        // Covers carry an image-processing suffix after '!'
        let image = track
            .cover_url
            .as_deref()
            .and_then(|cover| cover.split('!').next())
            .and_then(absolute_url)
            .unwrap_or_else(|| album.cover_url.clone());

        FeedItem {
            title: track.title.clone(),
            link: format!("{}/sound/{}", self.site_url, track.id),
            description,
            pub_date: timestamp_from_millis(track.created_at_ms),
            image,
            enclosure,
        }
    }
}

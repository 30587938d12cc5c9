use serde::Serialize;
use std::collections::HashMap;

use crate::platform::models::{AlbumMainInfo, TrackRecord};
use crate::util::{absolute_url, html_to_text};

/// Platform track identifier, unique within an album.
pub type TrackId = u64;

// ============================================================================
// Album
// ============================================================================

/// Album-level metadata, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    /// Absolute cover image URL (empty when the platform has none)
    pub cover_url: String,
    /// Plain-text album intro (markup stripped)
    pub intro: String,
    /// Platform category name, before translation
    pub category: String,
    pub is_paid: bool,
    pub author: String,
}

impl Album {
    pub(crate) fn from_main_info(album_id: &str, info: AlbumMainInfo) -> Self {
        Self {
            id: album_id.to_string(),
            title: info.album_title.unwrap_or_default(),
            cover_url: info
                .cover
                .as_deref()
                .and_then(absolute_url)
                .unwrap_or_default(),
            intro: html_to_text(info.detail_rich_intro.as_deref().unwrap_or_default()),
            category: info.category_title.unwrap_or_default(),
            is_paid: info.is_paid,
            author: info.anchor_name.unwrap_or_default(),
        }
    }
}

// ============================================================================
// Track
// ============================================================================

/// One episode as listed by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub cover_url: Option<String>,
    /// Creation time, epoch milliseconds
    pub created_at_ms: i64,
    pub duration_secs: u64,
    /// Short intro, the fallback description
    pub intro: String,
    /// Public 224 kbps AAC URL
    pub play_url_high: Option<String>,
    /// Public 164 kbps AAC URL
    pub play_url_low: Option<String>,
}

impl From<TrackRecord> for Track {
    fn from(record: TrackRecord) -> Self {
        Self {
            id: record.track_id,
            title: record.title.unwrap_or_default(),
            cover_url: record.cover_large.filter(|c| !c.trim().is_empty()),
            created_at_ms: record.created_at,
            duration_secs: record.duration,
            intro: record.intro.unwrap_or_default(),
            play_url_high: record.play_path_aacv224.filter(|u| !u.is_empty()),
            play_url_low: record.play_path_aacv164.filter(|u| !u.is_empty()),
        }
    }
}

/// One page of an album's track listing.
#[derive(Debug, Clone)]
pub struct PagedTrackBatch {
    pub page_id: u32,
    pub max_page_id: u32,
    /// In platform order
    pub tracks: Vec<Track>,
}

// ============================================================================
// Enrichment
// ============================================================================

/// Outcome of a paid play-info lookup.
///
/// The default (both `None`) is the denied/degraded result: the track keeps
/// its public state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaidResolution {
    /// Decrypted, authorized play URL
    pub play_url: Option<String>,
    /// Replacement description served to authorized listeners
    pub description: Option<String>,
}

/// A track plus everything the enrichment stages resolved for it.
///
/// Built fresh from the fetched [`Track`]; the fetched record itself is never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTrack {
    pub track: Track,
    pub description: String,
    pub resolved_play_url: Option<String>,
}

/// Merges enrichment results into new per-track records, keyed by track id.
///
/// Tracks without a description entry (their enrichment failed under the
/// skip policy) are left out. Output order follows `tracks`.
pub fn merge_enrichment(
    tracks: Vec<Track>,
    mut descriptions: HashMap<TrackId, String>,
    mut paid: HashMap<TrackId, PaidResolution>,
) -> Vec<EnrichedTrack> {
    tracks
        .into_iter()
        .filter_map(|track| {
            let description = descriptions.remove(&track.id)?;
            let resolution = paid.remove(&track.id).unwrap_or_default();
            Some(EnrichedTrack {
                description: resolution.description.unwrap_or(description),
                resolved_play_url: resolution.play_url,
                track,
            })
        })
        .collect()
}

/// A track left out of the feed under the skip failure policy.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTrack {
    pub track_id: TrackId,
    /// Stage that failed ("description" or "paid")
    pub stage: &'static str,
    pub reason: String,
}

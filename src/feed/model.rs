use chrono::{DateTime, Utc};
use serde::Serialize;

/// A podcast-style feed for one album.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feed {
    pub title: String,
    /// Canonical album page
    pub link: String,
    /// Plain-text album intro
    pub description: String,
    pub image: String,
    pub author: String,
    /// Category after translation
    pub category: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub image: String,
    pub enclosure: Option<Enclosure>,
}

/// Playable media attached to an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: &'static str,
    pub duration_secs: u64,
}

//! Wire models for the platform's JSON endpoints.
//!
//! Fields the platform sometimes sends as `null` are `Option`s; everything
//! else defaults so a sparse record still decodes.

use serde::Deserialize;

/// `GET /revision/album/v1/simple`
#[derive(Debug, Deserialize)]
pub struct AlbumEnvelope {
    #[serde(default)]
    pub data: Option<AlbumData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumData {
    #[serde(default)]
    pub album_page_main_info: Option<AlbumMainInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumMainInfo {
    #[serde(default)]
    pub album_title: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub detail_rich_intro: Option<String>,
    #[serde(default)]
    pub category_title: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub anchor_name: Option<String>,
}

/// `GET /mobile/v1/album/track/`
#[derive(Debug, Deserialize)]
pub struct TrackPageEnvelope {
    pub data: TrackPageData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPageData {
    #[serde(default)]
    pub page_id: Option<u32>,
    #[serde(default = "first_page")]
    pub max_page_id: u32,
    #[serde(default)]
    pub list: Vec<TrackRecord>,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub track_id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cover_large: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Seconds.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub intro: Option<String>,
    #[serde(default)]
    pub play_path_aacv224: Option<String>,
    #[serde(default)]
    pub play_path_aacv164: Option<String>,
}

/// `GET /mobile-track/richIntro`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichIntro {
    #[serde(default)]
    pub rich_intro: Option<String>,
}

/// `GET /mobile-playpage/track/v3/baseInfo/{timestamp}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayInfoEnvelope {
    #[serde(default)]
    pub track_info: Option<PayTrackInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayTrackInfo {
    #[serde(default)]
    pub is_authorized: bool,
    #[serde(default)]
    pub play_url_list: Vec<EncryptedPlayUrl>,
    /// Intro served to authorized listeners; replaces the public one when present.
    #[serde(default)]
    pub intro: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EncryptedPlayUrl {
    pub url: String,
}

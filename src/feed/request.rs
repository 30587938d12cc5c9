/// What to build: one album, in one listing and show-note mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    /// Category slug from the album page URL; `album` works for any album
    pub album_type: String,
    pub album_id: String,
    /// List every page instead of only the first
    pub fetch_all: bool,
    /// Fetch each track's rich show-note
    pub show_note: bool,
}

impl FeedRequest {
    pub fn new(album_id: impl Into<String>) -> Self {
        Self {
            album_type: "album".to_string(),
            album_id: album_id.into(),
            fetch_all: false,
            show_note: false,
        }
    }

    /// Builds a request from raw route-style parameters.
    ///
    /// `all` enables fetch-all when it is `true`, `1` or `all`; `shownote`
    /// enables show-notes when it is `true`, `1` or `shownote`. Matching is
    /// case-insensitive; anything else (including absence) means off.
    pub fn from_params(
        album_type: &str,
        album_id: &str,
        all: Option<&str>,
        shownote: Option<&str>,
    ) -> Self {
        let album_type = album_type.trim();
        Self {
            album_type: if album_type.is_empty() {
                "album".to_string()
            } else {
                album_type.to_string()
            },
            album_id: album_id.trim().to_string(),
            fetch_all: is_truthy(all, "all"),
            show_note: is_truthy(shownote, "shownote"),
        }
    }
}

fn is_truthy(raw: Option<&str>, keyword: &str) -> bool {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return false;
    };
    let value = raw.to_lowercase();
    value == "true" || value == "1" || value == keyword
}

use crate::cache::ResolveCache;
use crate::platform::PlatformClient;

use super::error::FeedError;
use super::types::{Track, TrackId};

/// Per-track description, cached per (track, show-note mode).
///
/// Rich show-notes cost one request per track, so they are only fetched
/// when asked for; the short intro is the fallback either way.
pub struct TrackDescriptionCache {
    client: PlatformClient,
    cache: ResolveCache<(TrackId, bool), String>,
}

impl TrackDescriptionCache {
    pub fn new(client: PlatformClient, cache: ResolveCache<(TrackId, bool), String>) -> Self {
        Self { client, cache }
    }

    pub async fn describe(&self, track: &Track, rich: bool) -> Result<String, FeedError> {
        self.cache
            .resolve((track.id, rich), self.compute(track, rich))
            .await
            .map_err(FeedError::from)
    }

    async fn compute(&self, track: &Track, rich: bool) -> Result<String, FeedError> {
        if rich {
            let note = self
                .client
                .fetch_rich_intro(track.id)
                .await?
                .rich_intro
                .unwrap_or_default();
            if !note.is_empty() {
                return Ok(note);
            }
            tracing::debug!(track_id = track.id, "Empty show-note, using short intro");
        }
        Ok(track.intro.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorKind;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn track(id: TrackId, intro: &str) -> Track {
        Track {
            id,
            title: "t".into(),
            cover_url: None,
            created_at_ms: 0,
            duration_secs: 0,
            intro: intro.into(),
            play_url_high: None,
            play_url_low: None,
        }
    }

    fn describer_for(server: &MockServer) -> TrackDescriptionCache {
        TrackDescriptionCache::new(
            PlatformClient::for_mock_server(&server.uri()),
            ResolveCache::new(100, Duration::from_secs(60)),
        )
    }

    async fn mount_rich_intro(server: &MockServer, track_id: TrackId, body: serde_json::Value, hits: u64) {
        Mock::given(method("GET"))
            .and(path("/mobile-track/richIntro"))
            .and(query_param("trackId", track_id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(hits)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_short_intro_without_rich_mode_makes_no_request() {
        let server = MockServer::start().await;
        mount_rich_intro(&server, 1, json!({ "richIntro": "<p>rich</p>" }), 0).await;

        let text = describer_for(&server)
            .describe(&track(1, "short"), false)
            .await
            .unwrap();
        assert_eq!(text, "short");
    }

    #[tokio::test]
    async fn test_rich_mode_fetches_show_note_once() {
        let server = MockServer::start().await;
        mount_rich_intro(&server, 1, json!({ "richIntro": "<p>rich</p>" }), 1).await;

        let describer = describer_for(&server);
        for _ in 0..3 {
            let text = describer.describe(&track(1, "short"), true).await.unwrap();
            assert_eq!(text, "<p>rich</p>");
        }
    }

    #[tokio::test]
    async fn test_empty_show_note_falls_back_to_intro() {
        let server = MockServer::start().await;
        mount_rich_intro(&server, 2, json!({ "richIntro": "" }), 1).await;
        mount_rich_intro(&server, 3, json!({}), 1).await;

        let describer = describer_for(&server);
        assert_eq!(describer.describe(&track(2, "two"), true).await.unwrap(), "two");
        assert_eq!(describer.describe(&track(3, "three"), true).await.unwrap(), "three");
    }

    #[tokio::test]
    async fn test_modes_do_not_share_cache_entries() {
        let server = MockServer::start().await;
        mount_rich_intro(&server, 4, json!({ "richIntro": "rich four" }), 1).await;

        let describer = describer_for(&server);
        assert_eq!(describer.describe(&track(4, "short four"), false).await.unwrap(), "short four");
        assert_eq!(describer.describe(&track(4, "short four"), true).await.unwrap(), "rich four");
        assert_eq!(describer.describe(&track(4, "short four"), false).await.unwrap(), "short four");
    }

    #[tokio::test]
    async fn test_show_note_failure_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = describer_for(&server)
            .describe(&track(5, "x"), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}

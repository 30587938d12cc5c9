use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::cache::ResolveCache;
use crate::platform::{decrypt_play_url, session_token, PlatformClient};

use super::error::FeedError;
use super::types::{PaidResolution, TrackId};

/// How paid play-info results are keyed in the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaidCacheKey {
    /// The full time-stamped request URL. Every call builds a new URL, so
    /// lookups from separate builds never hit.
    #[default]
    RequestUrl,
    /// Track id plus a fingerprint of the credential; results are reused
    /// for the cache TTL.
    TrackAndCredential,
}

/// Authorized play URLs for premium tracks.
///
/// Only constructed when a credential is configured; the builder only calls
/// it for albums marked paid.
pub struct PaidContentResolver {
    client: PlatformClient,
    cache: ResolveCache<String, PaidResolution>,
    credential: SecretString,
    key_mode: PaidCacheKey,
}

/// Per-build state: one session identifier shared by every track lookup.
pub struct PaidBatch<'a> {
    resolver: &'a PaidContentResolver,
    session: String,
}

impl PaidContentResolver {
    pub fn new(
        client: PlatformClient,
        cache: ResolveCache<String, PaidResolution>,
        credential: SecretString,
    ) -> Self {
        Self {
            client,
            cache,
            credential,
            key_mode: PaidCacheKey::default(),
        }
    }

    pub fn with_cache_key(mut self, key_mode: PaidCacheKey) -> Self {
        self.key_mode = key_mode;
        self
    }

    /// Starts a resolution batch with a fresh session identifier.
    pub fn batch(&self) -> PaidBatch<'_> {
        PaidBatch {
            resolver: self,
            session: session_token(),
        }
    }

    fn cache_key(&self, track_id: TrackId, url: &Url) -> String {
        match self.key_mode {
            PaidCacheKey::RequestUrl => format!("trackPayInfo{url}"),
            PaidCacheKey::TrackAndCredential => {
                format!("trackPayInfo:{track_id}:{}", self.credential_fingerprint())
            }
        }
    }

    fn credential_fingerprint(&self) -> String {
        let digest = Sha256::digest(self.credential.expose_secret().as_bytes());
        format!("{:x}", digest)[..16].to_string()
    }

    async fn fetch(
        &self,
        url: Url,
        track_id: TrackId,
        session: &str,
    ) -> Result<PaidResolution, FeedError> {
        let envelope = self
            .client
            .fetch_play_info(url, session, &self.credential)
            .await?;

        let Some(info) = envelope.track_info else {
            tracing::debug!(track_id = track_id, "No track info in play-info response");
            return Ok(PaidResolution::default());
        };

        if !info.is_authorized {
            tracing::debug!(track_id = track_id, "Credential not authorized for track");
            return Ok(PaidResolution::default());
        }

        let Some(encrypted) = info.play_url_list.first() else {
            tracing::debug!(track_id = track_id, "Authorized but no play URL returned");
            return Ok(PaidResolution::default());
        };

        match decrypt_play_url(&encrypted.url) {
            Ok(play_url) if !play_url.is_empty() => {
                tracing::debug!(track_id = track_id, "Resolved paid play URL");
                Ok(PaidResolution {
                    play_url: Some(play_url),
                    description: info.intro.filter(|d| !d.is_empty()),
                })
            }
            Ok(_) => Ok(PaidResolution::default()),
            Err(e) => {
                tracing::warn!(track_id = track_id, error = %e, "Failed to decrypt paid play URL");
                Ok(PaidResolution::default())
            }
        }
    }
}

impl PaidBatch<'_> {
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Resolves one track.
    ///
    /// A denied authorization is not an error: it yields
    /// `PaidResolution::default()` and the track keeps its public state.
    ///
    /// # Errors
    ///
    /// [`FeedError::Transport`] when the play-info request itself fails.
    pub async fn resolve(&self, track_id: TrackId) -> Result<PaidResolution, FeedError> {
        let resolver = self.resolver;
        let url = resolver
            .client
            .play_info_url(track_id, Utc::now().timestamp_millis())?;
        let key = resolver.cache_key(track_id, &url);

        resolver
            .cache
            .resolve(key, resolver.fetch(url, track_id, &self.session))
            .await
            .map_err(FeedError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ErrorKind;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // AES-128-ECB of "https://aod.cos.tx.xmcdn.com/storages/abcd/sample.m4a"
    const SAMPLE_CIPHER: &str =
        "snKr7BtRMlJ2LdDBVGL5UQ0MjkyNg0BcfOvjy0jXWQaVZQkyEGAZVZAO8JYAfg2mMZrgYkNij-r_OgrR3KdvjA";

    fn resolver_for(server: &MockServer) -> PaidContentResolver {
        PaidContentResolver::new(
            PlatformClient::for_mock_server(&server.uri()),
            ResolveCache::new(100, Duration::from_secs(60)),
            SecretString::from("token-abc"),
        )
    }

    async fn mount_play_info(server: &MockServer, track_id: TrackId, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/mobile-playpage/track/v3/baseInfo/\d+$"))
            .and(query_param("trackId", track_id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_authorized_track_yields_decrypted_url() {
        let server = MockServer::start().await;
        mount_play_info(
            &server,
            11,
            json!({ "trackInfo": { "isAuthorized": true, "playUrlList": [{ "url": SAMPLE_CIPHER }] } }),
        )
        .await;

        let resolver = resolver_for(&server);
        let resolution = resolver.batch().resolve(11).await.unwrap();
        assert_eq!(
            resolution.play_url.as_deref(),
            Some("https://aod.cos.tx.xmcdn.com/storages/abcd/sample.m4a")
        );
        assert_eq!(resolution.description, None);
    }

    #[tokio::test]
    async fn test_unauthorized_track_yields_empty_resolution() {
        let server = MockServer::start().await;
        mount_play_info(
            &server,
            12,
            json!({ "trackInfo": { "isAuthorized": false, "playUrlList": [{ "url": SAMPLE_CIPHER }] } }),
        )
        .await;

        let resolution = resolver_for(&server).batch().resolve(12).await.unwrap();
        assert_eq!(resolution, PaidResolution::default());
    }

    #[tokio::test]
    async fn test_undecryptable_url_degrades() {
        let server = MockServer::start().await;
        mount_play_info(
            &server,
            13,
            json!({ "trackInfo": { "isAuthorized": true, "playUrlList": [{ "url": "%%%" }] } }),
        )
        .await;

        let resolution = resolver_for(&server).batch().resolve(13).await.unwrap();
        assert_eq!(resolution, PaidResolution::default());
    }

    #[tokio::test]
    async fn test_authorized_intro_replaces_description() {
        let server = MockServer::start().await;
        mount_play_info(
            &server,
            14,
            json!({ "trackInfo": {
                "isAuthorized": true,
                "playUrlList": [{ "url": SAMPLE_CIPHER }],
                "intro": "Full notes"
            } }),
        )
        .await;

        let resolution = resolver_for(&server).batch().resolve(14).await.unwrap();
        assert_eq!(resolution.description.as_deref(), Some("Full notes"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = resolver_for(&server).batch().resolve(15).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_batch_reuses_one_session() {
        let server = MockServer::start().await;
        let resolver = resolver_for(&server);
        let batch = resolver.batch();
        let other = resolver.batch();

        assert_eq!(batch.session().len(), 36);
        assert_ne!(batch.session(), other.session());
    }

    #[tokio::test]
    async fn test_request_url_key_never_hits_across_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/mobile-playpage/track/v3/baseInfo/\d+$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "trackInfo": { "isAuthorized": false } })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        resolver.batch().resolve(16).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        resolver.batch().resolve(16).await.unwrap();
    }

    #[tokio::test]
    async fn test_track_and_credential_key_reuses_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/mobile-playpage/track/v3/baseInfo/\d+$"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "trackInfo": { "isAuthorized": false } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver_for(&server).with_cache_key(PaidCacheKey::TrackAndCredential);
        resolver.batch().resolve(17).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        resolver.batch().resolve(17).await.unwrap();
    }

    #[test]
    fn test_cache_key_does_not_expose_credential() {
        let resolver = PaidContentResolver::new(
            PlatformClient::for_mock_server("http://127.0.0.1:1"),
            ResolveCache::new(1, Duration::from_secs(1)),
            SecretString::from("token-abc"),
        )
        .with_cache_key(PaidCacheKey::TrackAndCredential);
        let url = Url::parse("http://127.0.0.1:1/x").unwrap();

        let key = resolver.cache_key(9, &url);
        assert!(key.starts_with("trackPayInfo:9:"));
        assert!(!key.contains("token-abc"));
    }
}

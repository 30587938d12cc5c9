use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::models::{AlbumEnvelope, PayInfoEnvelope, RichIntro, TrackPageData, TrackPageEnvelope};

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// User agent of the mobile app build whose cookie format the play-info endpoint accepts.
const PLAY_INFO_USER_AGENT: &str = "ting_6.7.9(GM1900,Android29)";

/// Errors from a single remote call.
///
/// No retry happens at this layer; callers decide what a failure means.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not the JSON shape we expected
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Endpoint URL could not be built from the configured base
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// A header value contained bytes HTTP does not allow
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),
}

/// Base URLs of the two hosts the platform splits its API across.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Public website; also the base for feed and episode links.
    pub site: Url,
    /// Mobile API host serving track pages and show-notes.
    pub mobile: Url,
}

impl Endpoints {
    pub const DEFAULT_SITE: &'static str = "https://www.ximalaya.com";
    pub const DEFAULT_MOBILE: &'static str = "https://mobile.ximalaya.com";
}

/// Builds the shared HTTP client: pooled connections and a bounded redirect policy.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, PlatformError> {
    let client = reqwest::Client::builder()
        .redirect(redirect_policy())
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// At most 3 hops; a URL seen twice in one chain is a loop.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// JSON-over-HTTP access to the platform.
///
/// Cheap to clone: the `reqwest::Client` and endpoints are shared.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    endpoints: Arc<Endpoints>,
    timeout: Duration,
}

impl PlatformClient {
    pub fn new(http: reqwest::Client, endpoints: Endpoints, timeout: Duration) -> Self {
        Self {
            http,
            endpoints: Arc::new(endpoints),
            timeout,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Client pointing both hosts at one mock server.
    #[cfg(test)]
    pub(crate) fn for_mock_server(uri: &str) -> Self {
        let base = Url::parse(uri).unwrap();
        Self::new(
            reqwest::Client::new(),
            Endpoints {
                site: base.clone(),
                mobile: base,
            },
            Duration::from_secs(5),
        )
    }

    pub async fn fetch_album(&self, album_id: &str) -> Result<AlbumEnvelope, PlatformError> {
        let url = endpoint(
            &self.endpoints.site,
            "revision/album/v1/simple",
            &[("albumId", album_id)],
        )?;
        self.get_json(url, HeaderMap::new()).await
    }

    pub async fn fetch_track_page(
        &self,
        album_id: &str,
        page_size: u32,
        page_id: u32,
    ) -> Result<TrackPageData, PlatformError> {
        let url = endpoint(
            &self.endpoints.mobile,
            "mobile/v1/album/track/",
            &[
                ("albumId", album_id),
                ("pageSize", &page_size.to_string()),
                ("pageId", &page_id.to_string()),
            ],
        )?;
        let envelope: TrackPageEnvelope = self.get_json(url, HeaderMap::new()).await?;
        Ok(envelope.data)
    }

    pub async fn fetch_rich_intro(&self, track_id: u64) -> Result<RichIntro, PlatformError> {
        let url = endpoint(
            &self.endpoints.mobile,
            "mobile-track/richIntro",
            &[("trackId", &track_id.to_string())],
        )?;
        self.get_json(url, HeaderMap::new()).await
    }

    /// Builds the time-stamped play-info URL for one track.
    ///
    /// The timestamp is part of the path, so two calls made at different
    /// milliseconds never produce the same URL.
    pub fn play_info_url(&self, track_id: u64, timestamp_ms: i64) -> Result<Url, PlatformError> {
        endpoint(
            &self.endpoints.site,
            &format!("mobile-playpage/track/v3/baseInfo/{timestamp_ms}"),
            &[
                ("device", "www2"),
                ("trackQualityLevel", "2"),
                ("trackId", &track_id.to_string()),
            ],
        )
    }

    /// Fetches paid play info, authenticating with the listener's token.
    pub async fn fetch_play_info(
        &self,
        url: Url,
        session: &str,
        token: &SecretString,
    ) -> Result<PayInfoEnvelope, PlatformError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(PLAY_INFO_USER_AGENT));

        let cookie = format!(
            "1&_device=android&{session}&6.7.9;1&_token={}",
            token.expose_secret()
        );
        let mut cookie =
            HeaderValue::from_str(&cookie).map_err(|_| PlatformError::InvalidHeader("cookie"))?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);

        self.get_json(url, headers).await
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        headers: HeaderMap,
    ) -> Result<T, PlatformError> {
        tracing::trace!(url = %url, "GET");

        let response = tokio::time::timeout(
            self.timeout,
            self.http.get(url.clone()).headers(headers).send(),
        )
        .await
        .map_err(|_| PlatformError::Timeout)?
        .map_err(PlatformError::Network)?;

        if !response.status().is_success() {
            tracing::debug!(url = %url, status = %response.status(), "Platform returned error status");
            return Err(PlatformError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn endpoint(base: &Url, path: &str, query: &[(&str, &str)]) -> Result<Url, PlatformError> {
    let mut url = base.join(path)?;
    url.query_pairs_mut().extend_pairs(query);
    Ok(url)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, PlatformError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(PlatformError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(PlatformError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(PlatformError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

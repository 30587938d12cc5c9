//! Configuration file parser for ~/.config/ximalaya-feed/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning for each one
//! since they are usually typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::cache::MAX_TIME_TO_LIVE;
use crate::pipeline::{
    BuildOptions, CategoryTable, FailurePolicy, PaidCacheKey, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_PAGE_SIZE, FULL_PAGE_SIZE,
};
use crate::platform::Endpoints;
use crate::util::validate_base_url;

/// Environment variable holding the listener credential. Wins over `token`.
pub const TOKEN_ENV: &str = "XIMALAYA_TOKEN";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid {key}: {reason}")]
    InvalidUrl { key: &'static str, reason: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The custom Debug impl masks `token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Public website base; feed and episode links are built on it.
    pub site_url: String,

    /// Mobile API base for track pages and show-notes.
    pub mobile_url: String,

    /// Listener credential for paid albums (alternative to XIMALAYA_TOKEN).
    pub token: Option<String>,

    /// Tracks per page when only the first page is listed.
    pub page_size: u32,

    /// Tracks per page when every page is listed.
    pub full_page_size: u32,

    /// Upper bound on concurrent requests per fan-out.
    pub max_concurrency: usize,

    pub request_timeout_secs: u64,

    /// Entries per cache (albums, descriptions, play info).
    pub cache_capacity: u64,

    pub cache_ttl_secs: u64,

    pub failure_policy: FailurePolicy,

    pub paid_cache_key: PaidCacheKey,

    /// Category translations merged over the built-in table.
    pub categories: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: Endpoints::DEFAULT_SITE.to_string(),
            mobile_url: Endpoints::DEFAULT_MOBILE.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            full_page_size: FULL_PAGE_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout_secs: 30,
            cache_capacity: 10_000,
            cache_ttl_secs: 3600,
            failure_policy: FailurePolicy::default(),
            paid_cache_key: PaidCacheKey::default(),
            categories: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("site_url", &self.site_url)
            .field("mobile_url", &self.mobile_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("page_size", &self.page_size)
            .field("full_page_size", &self.full_page_size)
            .field("max_concurrency", &self.max_concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("cache_capacity", &self.cache_capacity)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("failure_policy", &self.failure_policy)
            .field("paid_cache_key", &self.paid_cache_key)
            .field("categories", &self.categories)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 12] = [
        "site_url",
        "mobile_url",
        "token",
        "page_size",
        "full_page_size",
        "max_concurrency",
        "request_timeout_secs",
        "cache_capacity",
        "cache_ttl_secs",
        "failure_policy",
        "paid_cache_key",
        "categories",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            site_url = %config.site_url,
            failure_policy = ?config.failure_policy,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Rejects values the cache or HTTP layer cannot honour.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs > MAX_TIME_TO_LIVE.as_secs() {
            return Err(ConfigError::InvalidValue {
                key: "cache_ttl_secs",
                reason: format!(
                    "{} exceeds the maximum of {} seconds",
                    self.cache_ttl_secs,
                    MAX_TIME_TO_LIVE.as_secs()
                ),
            });
        }
        Ok(())
    }

    /// The listener credential: `XIMALAYA_TOKEN` if set and non-empty,
    /// otherwise the `token` key.
    pub fn credential(&self) -> Option<SecretString> {
        self.credential_with_env(std::env::var(TOKEN_ENV).ok())
    }

    fn credential_with_env(&self, env_token: Option<String>) -> Option<SecretString> {
        env_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.token.clone().filter(|t| !t.trim().is_empty()))
            .map(SecretString::from)
    }

    /// Validated platform base URLs.
    pub fn endpoints(&self) -> Result<Endpoints, ConfigError> {
        Ok(Endpoints {
            site: Self::base_url("site_url", &self.site_url)?,
            mobile: Self::base_url("mobile_url", &self.mobile_url)?,
        })
    }

    fn base_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
        let mut url = validate_base_url(raw).map_err(|e| ConfigError::InvalidUrl {
            key,
            reason: e.to_string(),
        })?;
        // Relative endpoint paths are joined onto the base, which needs a trailing slash
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            page_size: self.page_size.max(1),
            full_page_size: self.full_page_size.max(1),
            max_concurrency: self.max_concurrency.max(1),
            failure_policy: self.failure_policy,
            paid_cache_key: self.paid_cache_key,
        }
    }

    pub fn category_table(&self) -> CategoryTable {
        CategoryTable::with_overrides(self.categories.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs).min(MAX_TIME_TO_LIVE)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("ximalaya_feed_config_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site_url, "https://www.ximalaya.com");
        assert_eq!(config.mobile_url, "https://mobile.ximalaya.com");
        assert_eq!(config.page_size, 30);
        assert_eq!(config.full_page_size, 200);
        assert_eq!(config.max_concurrency, 16);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.cache_capacity, 10_000);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.paid_cache_key, PaidCacheKey::RequestUrl);
        assert!(config.token.is_none());
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/ximalaya_feed_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.page_size, 30);
    }

    #[test]
    fn test_empty_file_returns_default() {
        let path = write_config("empty", "  \n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_concurrency, 16);
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let path = write_config(
            "full",
            r#"
site_url = "https://www.example.com"
mobile_url = "https://m.example.com"
token = "tok-123"
page_size = 50
full_page_size = 100
max_concurrency = 4
request_timeout_secs = 10
cache_capacity = 50
cache_ttl_secs = 60
failure_policy = "skip"
paid_cache_key = "track_and_credential"

[categories]
"儿童" = "Kids & Family"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.site_url, "https://www.example.com");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.full_page_size, 100);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.failure_policy, FailurePolicy::Skip);
        assert_eq!(config.paid_cache_key, PaidCacheKey::TrackAndCredential);
        assert_eq!(config.category_table().translate("儿童"), "Kids & Family");
        assert_eq!(config.category_table().translate("音乐"), "Music");
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let path = write_config("unknown", "pagesize = 99\npage_size = 10\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.page_size, 10);
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let path = write_config("invalid", "page_size = = 3\n");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_failure_policy_is_parse_error() {
        let path = write_config("bad_policy", "failure_policy = \"retry\"\n");
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        cleanup(&path);
    }

    #[test]
    fn test_oversized_cache_ttl_is_rejected() {
        let path = write_config("huge_ttl", "cache_ttl_secs = 100000000000\n");
        let result = Config::load(&path);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "cache_ttl_secs",
                ..
            })
        ));
        cleanup(&path);
    }

    #[tokio::test]
    async fn test_unvalidated_huge_ttl_still_builds_cache() {
        let config: Config = toml::from_str("cache_ttl_secs = 100000000000").unwrap();
        assert_eq!(config.cache_ttl(), MAX_TIME_TO_LIVE);
        let cache = crate::cache::FeedCache::new(config.cache_capacity, config.cache_ttl());
        assert!(cache.albums.get(&"1".to_string()).await.is_none());
    }

    #[test]
    fn test_max_cache_ttl_is_accepted() {
        let content = format!("cache_ttl_secs = {}\n", MAX_TIME_TO_LIVE.as_secs());
        let path = write_config("max_ttl", &content);
        let config = Config::load(&path).unwrap();
        assert_eq!(config.cache_ttl(), MAX_TIME_TO_LIVE);
        cleanup(&path);
    }

    #[test]
    fn test_oversized_file_is_rejected() {
        let padding = "#".repeat(Config::MAX_FILE_SIZE as usize + 1);
        let path = write_config("too_large", &padding);
        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::TooLarge(_))));
        cleanup(&path);
    }

    #[test]
    fn test_debug_masks_token() {
        let config = Config {
            token: Some("super-secret".into()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_env_token_takes_precedence() {
        let config = Config {
            token: Some("from-file".into()),
            ..Config::default()
        };

        let from_env = config.credential_with_env(Some("from-env".into())).unwrap();
        assert_eq!(from_env.expose_secret(), "from-env");

        let from_file = config.credential_with_env(None).unwrap();
        assert_eq!(from_file.expose_secret(), "from-file");

        let blank_env = config.credential_with_env(Some("  ".into())).unwrap();
        assert_eq!(blank_env.expose_secret(), "from-file");
    }

    #[test]
    fn test_no_credential_when_nothing_set() {
        let config = Config {
            token: Some(String::new()),
            ..Config::default()
        };
        assert!(config.credential_with_env(None).is_none());
    }

    #[test]
    fn test_endpoints_are_validated() {
        let endpoints = Config::default().endpoints().unwrap();
        assert_eq!(endpoints.site.as_str(), "https://www.ximalaya.com/");

        let config = Config {
            mobile_url: "http://mobile.example.com".into(),
            ..Config::default()
        };
        let err = config.endpoints().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { key: "mobile_url", .. }));
    }

    #[test]
    fn test_loopback_http_is_allowed() {
        let config = Config {
            site_url: "http://127.0.0.1:8080/api".into(),
            mobile_url: "http://localhost:9090".into(),
            ..Config::default()
        };
        let endpoints = config.endpoints().unwrap();
        assert_eq!(endpoints.site.as_str(), "http://127.0.0.1:8080/api/");
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = Config {
            max_concurrency: 0,
            page_size: 0,
            ..Config::default()
        };
        let options = config.build_options();
        assert_eq!(options.max_concurrency, 1);
        assert_eq!(options.page_size, 1);
    }
}

use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur while validating a configured API base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-loopback host; the credential would travel in clear text.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    Insecure,
    /// The URL points to a private/internal IP address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
}

/// Validates a platform base URL from configuration.
///
/// - `https` is accepted for any public host
/// - `http` is accepted only for loopback hosts (mock servers in tests)
/// - private and link-local IP literals are rejected
///
/// # Examples
///
/// ```
/// use ximalaya_feed::util::validate_base_url;
///
/// assert!(validate_base_url("https://www.ximalaya.com").is_ok());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// assert!(validate_base_url("http://www.ximalaya.com").is_err());
/// assert!(validate_base_url("https://192.168.1.1").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    let loopback = match url.host_str() {
        Some("localhost") => true,
        Some(host) => {
            // Strip brackets from IPv6 addresses for parsing
            let host_for_parse = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            match host_for_parse.parse::<IpAddr>() {
                Ok(ip) if ip.is_loopback() => true,
                Ok(ip) if is_private_ip(&ip) => {
                    return Err(UrlValidationError::PrivateIp(ip.to_string()))
                }
                _ => false,
            }
        }
        None => false,
    };

    match url.scheme() {
        "https" => {}
        "http" if loopback => {
            tracing::warn!(base_url = %url, "Using non-HTTPS platform base URL (localhost only)");
        }
        "http" => return Err(UrlValidationError::Insecure),
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => ipv4.is_private() || ipv4.is_link_local() || ipv4.is_unspecified(),
        IpAddr::V6(ipv6) => {
            if ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}

/// Makes a platform asset URL absolute.
///
/// Album covers come back protocol-relative (`//imagev2.xmcdn.com/...`);
/// those get `https:`. Empty input yields `None`.
pub fn absolute_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else if raw.starts_with("//") {
        Some(format!("https:{raw}"))
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_public_accepted() {
        assert!(validate_base_url("https://www.ximalaya.com").is_ok());
        assert!(validate_base_url("https://mobile.ximalaya.com:443/").is_ok());
    }

    #[test]
    fn test_http_public_rejected() {
        assert!(matches!(
            validate_base_url("http://www.ximalaya.com"),
            Err(UrlValidationError::Insecure)
        ));
    }

    #[test]
    fn test_http_loopback_allowed() {
        assert!(validate_base_url("http://127.0.0.1:3000").is_ok());
        assert!(validate_base_url("http://localhost:3000").is_ok());
        assert!(validate_base_url("http://[::1]:3000").is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_base_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(validate_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_private_ips_rejected() {
        assert!(validate_base_url("https://192.168.1.1").is_err());
        assert!(validate_base_url("https://10.0.0.1").is_err());
        assert!(validate_base_url("https://172.16.0.1").is_err());
        assert!(validate_base_url("https://169.254.1.1").is_err());
        assert!(validate_base_url("https://[fe80::1]").is_err());
        assert!(validate_base_url("https://0.0.0.0").is_err());
    }

    #[test]
    fn test_unparseable_rejected() {
        assert!(matches!(
            validate_base_url("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("//imagev2.xmcdn.com/a.jpg").as_deref(),
            Some("https://imagev2.xmcdn.com/a.jpg")
        );
        assert_eq!(
            absolute_url("https://imagev2.xmcdn.com/a.jpg").as_deref(),
            Some("https://imagev2.xmcdn.com/a.jpg")
        );
        assert_eq!(absolute_url("  "), None);
    }
}

use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Reasons a URL is refused before any network request is made.
#[derive(Debug, Error)]
pub enum UrlCheckError {
    /// The URL string could not be parsed.
    #[error("invalid URL: {0}")]
    Invalid(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The URL points at this machine or a private network.
    #[error("refusing to fetch private or local address: {0}")]
    PrivateAddress(String),
}

/// Validate a URL string before it is accepted as a feed source.
///
/// The subscribe path calls this ahead of the preliminary fetch so a channel
/// operator cannot point the fetcher at `file://`, localhost, or an internal
/// network address. Operators watching feeds on their own LAN can opt out of
/// the address restriction with `allow_private`; the scheme restriction
/// always applies.
pub fn check_feed_url(url_str: &str, allow_private: bool) -> Result<Url, UrlCheckError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlCheckError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlCheckError::MissingHost)?;

    if allow_private {
        return Ok(url);
    }

    if host == "localhost" {
        return Err(UrlCheckError::PrivateAddress(host.to_owned()));
    }

    // Strip brackets from IPv6 literals for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = host_for_parse.parse::<IpAddr>() {
        if ip.is_loopback() || is_private_ip(&ip) {
            return Err(UrlCheckError::PrivateAddress(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            // fc00::/7 unique local, fe80::/10 link local
            let segments = v6.segments();
            (segments[0] & 0xfe00) == 0xfc00
                || (segments[0] & 0xffc0) == 0xfe80
                || v6.is_unspecified()
        }
    }
}

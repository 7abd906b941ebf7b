use crate::feed::parser::{parse_document, FetchedFeed};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Some feed hosts reject default library agents outright.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Errors that can occur while retrieving and normalizing one feed.
///
/// None of these are retried here: the subscribe path surfaces them to the
/// user, the detection cycle logs them and skips the link for the cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the per-fetch timeout
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Document could not be parsed as RSS or Atom
    #[error("parse error: {0}")]
    Parse(String),
    /// Feed parsed but lists no items. The subscribe path refuses such a
    /// feed; the detection cycle skips it for the cycle without failing.
    #[error("feed has no items")]
    EmptyFeed,
}

/// Retrieves and normalizes one feed by URL.
///
/// Wraps a shared `reqwest::Client`; cheap to clone. The per-fetch timeout
/// bounds the whole request so a hung host cannot stall a detection cycle
/// indefinitely.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetch `url` and normalize it into a [`FetchedFeed`].
    ///
    /// # Errors
    ///
    /// - [`FetchError::Timeout`] - the request exceeded the per-fetch timeout
    /// - [`FetchError::Network`] - connection or TLS errors
    /// - [`FetchError::HttpStatus`] - non-2xx HTTP response
    /// - [`FetchError::ResponseTooLarge`] - body exceeded the size limit
    /// - [`FetchError::Parse`] - invalid RSS/Atom XML
    /// - [`FetchError::EmptyFeed`] - parsed but zero items
    pub async fn fetch(&self, url: &str) -> Result<FetchedFeed, FetchError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = tokio::time::timeout(self.timeout, read_limited_bytes(response, MAX_FEED_SIZE))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let feed = parse_document(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

        if feed.items.is_empty() {
            return Err(FetchError::EmptyFeed);
        }

        Ok(feed)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // A network interruption can deliver fewer bytes than Content-Length
    // promised; surface it rather than hand a truncated document to the parser.
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

//! Upstream ICY fetcher
//!
//! Opens the audio stream with `Icy-MetaData: 1`, reads just far enough to
//! see the first metadata block, then drops the connection. A fetch never
//! drains the audio stream: the body read is bounded by `metaint + 1` bytes
//! plus at most one block (4080 bytes).
//!
//! "No metadata" outcomes (missing `icy-metaint`, zero-length block, no
//! StreamTitle) resolve to fallback metadata. Only network, timeout and
//! malformed-geometry problems are errors.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::icy::{self, BlockGeometry};
use crate::metadata::StreamMetadata;

/// Default `User-Agent` sent upstream
pub const DEFAULT_USER_AGENT: &str = "RadioCalico/1.0";
/// Default budget for one fetch (connect + headers + body read)
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a fetch produced no metadata.
///
/// Payloads are plain strings so a single result can be cloned out to every
/// caller waiting on the same refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// DNS, connection refused, TLS handshake
    #[error("failed to connect to stream: {0}")]
    Connect(String),
    /// Upstream status or I/O failure after the connection was made
    #[error("stream transport error: {0}")]
    Transport(String),
    /// Fetch exceeded its time budget
    #[error("stream request timed out after {0:?}")]
    Timeout(Duration),
    /// Stream ended before the advertised metadata block was complete
    #[error("malformed metadata block: {0}")]
    Decode(String),
}

/// Source of now-playing metadata for a stream URL
#[async_trait]
pub trait MetadataSource: Send + Sync + 'static {
    async fn fetch(&self, stream_url: &Url, timeout: Duration)
        -> Result<StreamMetadata, FetchError>;
}

/// Fetches ICY metadata over HTTP(S)
#[derive(Clone)]
pub struct IcyFetcher {
    http: Client,
}

impl IcyFetcher {
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Connect(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    async fn fetch_inner(&self, stream_url: &Url) -> Result<StreamMetadata, FetchError> {
        let mut response = self
            .http
            .get(stream_url.clone())
            .header("Icy-MetaData", "1")
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Transport(format!(
                "upstream responded with HTTP {}",
                status
            )));
        }

        let metaint = icy::parse_metaint(
            response
                .headers()
                .get("icy-metaint")
                .and_then(|v| v.to_str().ok()),
        );

        let Some(metaint) = metaint else {
            debug!("No icy-metaint from {}, serving fallback", stream_url);
            return Ok(StreamMetadata::fallback(Utc::now()));
        };

        let mut buffer = Vec::with_capacity(metaint + 1);
        read_at_least(&mut response, &mut buffer, metaint + 1).await?;

        let (start, len) = match icy::locate_block(&buffer, metaint) {
            BlockGeometry::Incomplete => {
                return Err(FetchError::Decode(format!(
                    "stream ended after {} bytes, before the length byte at offset {}",
                    buffer.len(),
                    metaint
                )));
            }
            BlockGeometry::Empty => {
                debug!("Empty metadata block this cycle, serving fallback");
                return Ok(StreamMetadata::fallback(Utc::now()));
            }
            BlockGeometry::Block { start, len } => (start, len),
        };

        read_at_least(&mut response, &mut buffer, start + len).await?;
        // Dropping the response closes the upstream connection
        drop(response);

        let block =
            icy::block_bytes(&buffer, start, len).map_err(|e| FetchError::Decode(e.to_string()))?;

        match icy::decode_stream_title(block) {
            Some(decoded) => {
                debug!("StreamTitle: {}", decoded.full_title);
                Ok(StreamMetadata::from_decoded(decoded, Utc::now()))
            }
            None => {
                debug!("Metadata block without StreamTitle, serving fallback");
                Ok(StreamMetadata::fallback(Utc::now()))
            }
        }
    }
}

#[async_trait]
impl MetadataSource for IcyFetcher {
    async fn fetch(
        &self,
        stream_url: &Url,
        timeout: Duration,
    ) -> Result<StreamMetadata, FetchError> {
        let result = match tokio::time::timeout(timeout, self.fetch_inner(stream_url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };

        if let Err(ref e) = result {
            warn!("Metadata fetch from {} failed: {}", stream_url, e);
        }
        result
    }
}

/// Accumulate body chunks until `buffer` holds `target` bytes or the stream ends.
///
/// Ending early is not an error here; the caller checks the geometry.
async fn read_at_least(
    response: &mut Response,
    buffer: &mut Vec<u8>,
    target: usize,
) -> Result<(), FetchError> {
    while buffer.len() < target {
        match response.chunk().await {
            Ok(Some(chunk)) => buffer.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => return Err(FetchError::Transport(e.to_string())),
        }
    }
    Ok(())
}

fn classify_send_error(e: reqwest::Error) -> FetchError {
    if e.is_connect() || e.is_builder() || e.is_request() {
        FetchError::Connect(e.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_cloneable_and_readable() {
        let err = FetchError::Timeout(Duration::from_secs(5));
        let copy = err.clone();
        assert_eq!(err, copy);
        assert_eq!(err.to_string(), "stream request timed out after 5s");
    }

    #[tokio::test]
    async fn unreachable_host_is_connect_error() {
        let fetcher = IcyFetcher::new(DEFAULT_USER_AGENT).unwrap();
        // Port 1 on loopback: nothing listens there
        let url = Url::parse("http://127.0.0.1:1/stream").unwrap();

        let err = fetcher
            .fetch(&url, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(
            matches!(err, FetchError::Connect(_)),
            "expected Connect, got {:?}",
            err
        );
    }
}

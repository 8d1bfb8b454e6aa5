//! MetadataService - composition root for `/metadata`
//!
//! cache hit → return; miss → resolve stream URL → fetch (single-flight) →
//! cache update → return.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::warn;

use crate::cache::MetadataCache;
use crate::config::{parse_stream_url, StreamUrlResolver};
use crate::fetcher::{FetchError, MetadataSource};
use crate::metadata::StreamMetadata;

/// Response-level failure of a metadata request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("stream URL unavailable: {0}")]
    Configuration(String),
    #[error("{0}")]
    Connect(String),
    #[error("{0}")]
    Transport(String),
    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Decode(String),
}

impl From<FetchError> for ServiceError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Connect(_) => ServiceError::Connect(err.to_string()),
            FetchError::Transport(_) => ServiceError::Transport(err.to_string()),
            FetchError::Timeout(budget) => ServiceError::Timeout(budget),
            FetchError::Decode(_) => ServiceError::Decode(err.to_string()),
        }
    }
}

/// Serves now-playing metadata through the shared cache
#[derive(Clone)]
pub struct MetadataService {
    resolver: Arc<dyn StreamUrlResolver>,
    source: Arc<dyn MetadataSource>,
    cache: MetadataCache,
    fetch_timeout: Duration,
}

impl MetadataService {
    pub fn new(
        resolver: Arc<dyn StreamUrlResolver>,
        source: Arc<dyn MetadataSource>,
        cache: MetadataCache,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            source,
            cache,
            fetch_timeout,
        }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub async fn get_metadata(&self) -> Result<StreamMetadata, ServiceError> {
        let now = Instant::now();
        if let Some(hit) = self.cache.get_fresh(now) {
            return Ok(hit);
        }

        let raw = self.resolver.resolve_stream_url().await.map_err(|e| {
            warn!("Error getting stream URL: {}", e);
            ServiceError::Configuration(e.to_string())
        })?;
        let url = parse_stream_url(&raw).map_err(|e| {
            warn!("Error getting stream URL: {}", e);
            ServiceError::Configuration(e.to_string())
        })?;

        let source = Arc::clone(&self.source);
        let timeout = self.fetch_timeout;
        self.cache
            .get_or_refresh(now, move || async move { source.fetch(&url, timeout).await })
            .await
            .map_err(ServiceError::from)
    }
}

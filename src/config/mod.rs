//! Configuration management
//!
//! Precedence for each setting: `CALICO_*` env var > `config.{toml,json,yaml}`
//! in the config directory > built-in default. The listen port also honors
//! the legacy `PORT` variable.
//!
//! The upstream stream URL is resolved per request (see [`StreamUrlSource`]),
//! so edits to `STREAM_URL` or the URL file apply without a restart.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::cache::DEFAULT_CACHE_TTL;
use crate::fetcher::{DEFAULT_FETCH_TIMEOUT, DEFAULT_USER_AGENT};

/// Env var checked first on every stream URL lookup
pub const STREAM_URL_ENV: &str = "STREAM_URL";
/// Plaintext file holding the stream URL when no env/config value is set
pub const DEFAULT_STREAM_URL_FILE: &str = "stream_URL.txt";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Stream URL from config file or `CALICO_STREAM_URL`
    #[serde(default)]
    pub stream_url: Option<String>,

    #[serde(default = "default_stream_url_file")]
    pub stream_url_file: PathBuf,

    /// Directory served for everything that is not an API route
    #[serde(default = "default_public_dir")]
    pub public_dir: PathBuf,

    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_port() -> u16 {
    3000
}

fn default_stream_url_file() -> PathBuf {
    PathBuf::from(DEFAULT_STREAM_URL_FILE)
}

fn default_public_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_cache_ttl_ms() -> u64 {
    DEFAULT_CACHE_TTL.as_millis() as u64
}

fn default_fetch_timeout_ms() -> u64 {
    DEFAULT_FETCH_TIMEOUT.as_millis() as u64
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Config {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn stream_url_source(&self) -> StreamUrlSource {
        StreamUrlSource::new(self.stream_url.clone(), self.stream_url_file.clone())
    }
}

/// Get config directory (`CALICO_CONFIG_DIR` or the working directory)
pub fn get_config_dir() -> PathBuf {
    std::env::var("CALICO_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir();

    let mut builder = ::config::Config::builder()
        .set_default("port", i64::from(default_port()))?
        .set_default("cache_ttl_ms", default_cache_ttl_ms() as i64)?
        .set_default("fetch_timeout_ms", default_fetch_timeout_ms() as i64)?
        .add_source(
            ::config::File::with_name(&config_dir.join("config").to_string_lossy()).required(false),
        )
        // CALICO_PORT, CALICO_STREAM_URL, CALICO_PUBLIC_DIR, ...
        .add_source(
            ::config::Environment::with_prefix("CALICO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    // Explicit precedence: CALICO_PORT > PORT > config > default.
    // An unparsable CALICO_PORT falls through to PORT, then to the default;
    // the override also masks the bad value the env source picked up.
    let calico_port = std::env::var("CALICO_PORT").ok();
    let port = calico_port
        .as_deref()
        .and_then(parse_port)
        .or_else(|| std::env::var("PORT").ok().as_deref().and_then(parse_port));
    if let Some(port_num) = port {
        builder = builder.set_override("port", i64::from(port_num))?;
    } else if calico_port.is_some() {
        builder = builder.set_override("port", i64::from(default_port()))?;
    }

    let config = builder.build()?;

    Ok(config.try_deserialize()?)
}

fn parse_port(value: &str) -> Option<u16> {
    value.trim().parse().ok()
}

// =============================================================================
// Stream URL resolution
// =============================================================================

#[derive(Debug, Error)]
pub enum StreamUrlError {
    #[error("failed to read stream URL from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid stream URL {url:?}: {reason}")]
    Invalid { url: String, reason: String },
}

/// Supplies the upstream stream URL on demand
#[async_trait]
pub trait StreamUrlResolver: Send + Sync {
    async fn resolve_stream_url(&self) -> Result<String, StreamUrlError>;
}

/// Production resolver: `STREAM_URL` env var, then configured value, then file
#[derive(Debug, Clone)]
pub struct StreamUrlSource {
    configured: Option<String>,
    file: PathBuf,
}

impl StreamUrlSource {
    pub fn new(configured: Option<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            configured: configured.filter(|url| !url.trim().is_empty()),
            file: file.into(),
        }
    }
}

#[async_trait]
impl StreamUrlResolver for StreamUrlSource {
    async fn resolve_stream_url(&self) -> Result<String, StreamUrlError> {
        if let Ok(url) = std::env::var(STREAM_URL_ENV) {
            if !url.is_empty() {
                return Ok(url);
            }
        }

        if let Some(url) = &self.configured {
            return Ok(url.clone());
        }

        let content =
            tokio::fs::read_to_string(&self.file)
                .await
                .map_err(|source| StreamUrlError::Read {
                    path: self.file.clone(),
                    source,
                })?;
        Ok(content.trim().to_string())
    }
}

/// Validate a resolved stream URL: must parse and use http or https
pub fn parse_stream_url(raw: &str) -> Result<Url, StreamUrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| StreamUrlError::Invalid {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(StreamUrlError::Invalid {
            url: raw.to_string(),
            reason: format!("unsupported scheme {:?}", other),
        }),
    }
}

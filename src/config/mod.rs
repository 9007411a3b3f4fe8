//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables
//! - CLI arguments (for the `chirp` binary)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ChirpError, Result};

/// Default cap on a single buffered stream frame (1 MiB)
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Platform base URLs
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Streaming settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// Cursor pagination settings
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ChirpError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| ChirpError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Overlay environment variables onto this config
    pub fn with_env(mut self) -> Self {
        if let Ok(base) = std::env::var("CHIRP_REST_BASE") {
            self.endpoints.rest_base = base;
        }
        if let Ok(base) = std::env::var("CHIRP_STREAM_BASE") {
            self.endpoints.stream_base = base;
        }
        if let Ok(agent) = std::env::var("CHIRP_USER_AGENT") {
            self.http.user_agent = agent;
        }
        if let Ok(auth) = std::env::var("CHIRP_AUTHORIZATION") {
            self.http
                .extra_headers
                .insert("Authorization".to_string(), auth);
        }
        if let Ok(val) = std::env::var("CHIRP_MAX_FRAME_BYTES") {
            match val.as_str() {
                "0" | "none" | "unbounded" => self.stream.max_frame_bytes = None,
                other => {
                    if let Ok(limit) = other.parse() {
                        self.stream.max_frame_bytes = Some(limit);
                    }
                },
            }
        }
        if let Ok(val) = std::env::var("CHIRP_MAX_PAGES") {
            if let Ok(pages) = val.parse() {
                self.pagination.max_pages = Some(pages);
            }
        }

        self
    }

    /// Default config file location (`<config dir>/chirp/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("chirp").join("config.toml"))
    }

    /// Load from an explicit file, else the default location if it exists,
    /// else defaults; environment variables are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(path)?,
                _ => Self::default(),
            },
        };

        Ok(base.with_env())
    }
}

/// Platform base URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// REST API base, prepended to paths starting with `/`
    pub rest_base: String,

    /// Search API base
    pub search_base: String,

    /// Public streams (`filter`, `sample`, ...)
    pub stream_base: String,

    /// User stream base
    pub user_stream_base: String,

    /// Site stream base
    pub site_stream_base: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            rest_base: "https://api.twitter.com/1".to_string(),
            search_base: "https://search.twitter.com".to_string(),
            stream_base: "https://stream.twitter.com/1".to_string(),
            user_stream_base: "https://userstream.twitter.com/2".to_string(),
            site_stream_base: "https://sitestream.twitter.com/2b".to_string(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header
    pub user_agent: String,

    /// Accept header
    pub accept: String,

    /// REST request timeout in seconds (streams have no read timeout)
    pub timeout_secs: u64,

    /// Connect timeout in seconds, applied to REST and streams
    pub connect_timeout_secs: u64,

    /// Headers added to every request, e.g. a pre-computed `Authorization`
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("chirp/{}", crate::VERSION),
            accept: "*/*".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            extra_headers: BTreeMap::new(),
        }
    }
}

/// Streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum bytes buffered for one frame; `None` or `0` disables the cap
    pub max_frame_bytes: Option<usize>,
}

impl StreamConfig {
    /// Effective frame cap, with `0` treated as unbounded
    pub fn frame_limit(&self) -> Option<usize> {
        self.max_frame_bytes.filter(|&limit| limit > 0)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: Some(DEFAULT_MAX_FRAME_BYTES),
        }
    }
}

/// Cursor pagination configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Stop with an error after this many pages; `None` walks until cursor `"0"`
    pub max_pages: Option<u32>,
}

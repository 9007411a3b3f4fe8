//! Streaming endpoint resolution.
//!
//! Stream names map onto one of three hosts: `user` and `site` have their
//! own bases, every other name (`filter`, `sample`, `firehose`, ...) lives
//! under the public stream base. The URL is `<base>/<name>.json`.

use reqwest::Url;

use crate::config::EndpointConfig;
use crate::error::{ChirpError, Result};

/// Which streaming host serves a stream name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Public streams on the stream base
    Public,
    /// The authenticated user's stream
    User,
    /// Multi-user site streams
    Site,
}

impl StreamKind {
    /// Classify a stream name
    pub fn for_name(name: &str) -> Self {
        match name {
            "user" => Self::User,
            "site" => Self::Site,
            _ => Self::Public,
        }
    }

    /// Base URL for this kind
    pub fn base<'a>(&self, endpoints: &'a EndpointConfig) -> &'a str {
        match self {
            Self::Public => &endpoints.stream_base,
            Self::User => &endpoints.user_stream_base,
            Self::Site => &endpoints.site_stream_base,
        }
    }
}

/// Resolve the URL for stream `name`
///
/// The name is percent-encoded as a single path segment.
pub fn stream_url(endpoints: &EndpointConfig, name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(ChirpError::Config("Stream name must not be empty".to_string()));
    }

    let base = StreamKind::for_name(name).base(endpoints);
    let mut url = Url::parse(base)
        .map_err(|e| ChirpError::Config(format!("Invalid stream base {base:?}: {e}")))?;

    url.path_segments_mut()
        .map_err(|()| ChirpError::Config(format!("Stream base {base:?} cannot carry a path")))?
        .pop_if_empty()
        .push(&format!("{name}.json"));

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_stream_url() {
        let endpoints = EndpointConfig::default();
        assert_eq!(
            stream_url(&endpoints, "filter").unwrap(),
            "https://stream.twitter.com/1/filter.json"
        );
        assert_eq!(StreamKind::for_name("sample"), StreamKind::Public);
    }

    #[test]
    fn test_user_and_site_streams_use_own_hosts() {
        let endpoints = EndpointConfig::default();
        assert_eq!(
            stream_url(&endpoints, "user").unwrap(),
            "https://userstream.twitter.com/2/user.json"
        );
        assert_eq!(
            stream_url(&endpoints, "site").unwrap(),
            "https://sitestream.twitter.com/2b/site.json"
        );
    }

    #[test]
    fn test_name_is_escaped() {
        let endpoints = EndpointConfig::default();
        let url = stream_url(&endpoints, "../admin?x=1").unwrap();
        assert!(url.starts_with("https://stream.twitter.com/1/"));
        assert!(!url.contains('?'));
    }

    #[test]
    fn test_trailing_slash_base() {
        let endpoints = EndpointConfig {
            stream_base: "http://127.0.0.1:8080/1/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            stream_url(&endpoints, "sample").unwrap(),
            "http://127.0.0.1:8080/1/sample.json"
        );
    }

    #[test]
    fn test_invalid_base_and_name() {
        let endpoints = EndpointConfig {
            stream_base: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            stream_url(&endpoints, "filter"),
            Err(ChirpError::Config(_))
        ));
        assert!(matches!(
            stream_url(&EndpointConfig::default(), ""),
            Err(ChirpError::Config(_))
        ));
    }
}

//! Transport layer for streaming connections.
//!
//! A transport opens one long-lived HTTP request and hands back the response
//! body as an ordered stream of byte chunks. The stream ends on graceful
//! close and yields an `Err` on connection failure. Dropping the stream
//! aborts the connection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             StreamSession               │
//! │      (FrameDecoder + event channel)     │
//! └──────────────────┬──────────────────────┘
//!                    │ open(StreamRequest)
//!          ┌────────┴────────┐
//!          ▼                 ▼
//! ┌─────────────────┐ ┌─────────────────┐
//! │  HttpTransport  │ │ custom / test   │
//! │   (reqwest)     │ │   transports    │
//! └─────────────────┘ └─────────────────┘
//! ```

mod channel;
mod http;

pub use channel::{ChannelTransport, ChunkSender};
pub use http::HttpTransport;
pub(crate) use http::build_client;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

use crate::error::Result;
use crate::params::Params;

/// Ordered body chunks of one open connection
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// HTTP method for opening a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamMethod {
    /// Form-encoded POST (default)
    #[default]
    Post,
    /// Parameters in the query string
    Get,
}

impl std::fmt::Display for StreamMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Post => write!(f, "POST"),
            Self::Get => write!(f, "GET"),
        }
    }
}

/// Parameters for opening one streaming connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Request method
    pub method: StreamMethod,
    /// Absolute URL
    pub url: String,
    /// Form (POST) or query (GET) parameters
    pub params: Params,
}

impl StreamRequest {
    /// Create a POST request with no parameters
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: StreamMethod::Post,
            url: url.into(),
            params: Params::new(),
        }
    }

    /// Create a GET request with no parameters
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: StreamMethod::Get,
            ..Self::post(url)
        }
    }

    /// Set the request parameters
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Transport trait for pluggable connection backends.
///
/// Implementations deliver chunks strictly in arrival order. Resolving
/// `open` successfully means the connection is confirmed (status accepted).
pub trait Transport: Send + Sync {
    /// Open the connection described by `request`.
    fn open(
        &self,
        request: StreamRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChunkStream>> + Send + '_>>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::params;

    #[test]
    fn test_stream_request_builders() {
        let request = StreamRequest::post("https://stream.example.com/1/filter.json")
            .with_params(params([("track", "rust")]));
        assert_eq!(request.method, StreamMethod::Post);
        assert_eq!(request.params.get("track").map(String::as_str), Some("rust"));

        let request = StreamRequest::get("https://stream.example.com/1/sample.json");
        assert_eq!(request.method, StreamMethod::Get);
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_stream_method_display() {
        assert_eq!(StreamMethod::Post.to_string(), "POST");
        assert_eq!(StreamMethod::default(), StreamMethod::Post);
    }
}

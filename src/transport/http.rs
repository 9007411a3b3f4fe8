//! HTTP transport backed by reqwest.
//!
//! Opens the streaming request, rejects non-success statuses before any
//! body is read, and exposes the body as a chunk stream. There is no read
//! timeout: the platform may stay quiet for long stretches between
//! keep-alives.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Client;

use super::{ChunkStream, StreamMethod, StreamRequest, Transport};
use crate::config::HttpConfig;
use crate::error::{ChirpError, Result};

/// Build a reqwest client from HTTP settings.
///
/// Redirects are never followed. `timeout` bounds whole requests and is
/// left unset for streams.
pub(crate) fn build_client(config: &HttpConfig, timeout: Option<Duration>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_str(&config.accept)
            .map_err(|e| ChirpError::Config(format!("Invalid Accept header: {e}")))?,
    );
    for (name, value) in &config.extra_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ChirpError::Config(format!("Invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ChirpError::Config(format!("Invalid value for header {name}: {e}")))?;
        headers.insert(name, value);
    }

    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(reqwest::redirect::Policy::none());

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| ChirpError::Config(format!("Failed to create HTTP client: {e}")))
}

/// Streaming transport over HTTP/1.1 chunked responses.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport from HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config, None)?,
        })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        request: StreamRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChunkStream>> + Send + '_>> {
        Box::pin(async move {
            tracing::debug!(method = %request.method, url = %request.url, "Opening stream");

            let builder = match request.method {
                StreamMethod::Post => self.client.post(&request.url).form(&request.params),
                StreamMethod::Get => self.client.get(&request.url).query(&request.params),
            };

            let response = builder
                .send()
                .await
                .map_err(|e| ChirpError::Transport(format!("Failed to connect: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ChirpError::Transport(format!(
                    "Stream rejected with HTTP {}: {}",
                    status.as_u16(),
                    body.trim()
                )));
            }

            let chunks = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| ChirpError::Transport(e.to_string())));

            Ok(Box::pin(chunks) as ChunkStream)
        })
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}

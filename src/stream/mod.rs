//! Streaming API sessions.
//!
//! Opens long-lived connections to the streaming endpoints and delivers
//! decoded messages in arrival order.
//!
//! # Event Flow
//!
//! ```text
//! Transport            StreamSession                 Application
//!    |                      |                            |
//!    |--- chunk ----------->| FrameDecoder::feed         |
//!    |                      |----- Message(json) ------->|
//!    |                      |----- Error(NonFatal) ----->|  bad segment
//!    |--- chunk ----------->|                            |
//!    |                      |----- Message(json) ------->|
//!    |--- end of body ----->|----- End ----------------->|  or
//!    |--- error ----------->|----- Error(Fatal) -------->|
//! ```
//!
//! Reconnecting after `End` or a fatal error is left to the caller.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chirp::{Config, StreamClient, StreamEvent};
//! use chirp::params::params;
//!
//! let client = StreamClient::new(Config::from_env())?;
//! let mut session = client.stream("filter", params([("track", "rust")]))?;
//!
//! while let Some(event) = session.next_event().await {
//!     match event {
//!         StreamEvent::Message(tweet) => println!("{}", tweet["text"]),
//!         StreamEvent::Error { class, error } => eprintln!("{class:?}: {error}"),
//!         StreamEvent::End => break,
//!     }
//! }
//! ```

mod endpoint;
mod session;
mod stats;

pub use endpoint::{stream_url, StreamKind};
pub use session::{SessionHandle, SessionState, StreamEvent, StreamSession};
pub use stats::{SessionStats, StatsSummary};

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::params::Params;
use crate::transport::{HttpTransport, StreamRequest, Transport};

/// Opens sessions against the configured streaming endpoints.
#[derive(Clone)]
pub struct StreamClient {
    config: Config,
    transport: Arc<dyn Transport>,
}

impl StreamClient {
    /// Create a client using the HTTP transport
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.http)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Start stream `name` (`filter`, `sample`, `user`, `site`, ...)
    /// with `params` form-encoded into the request body
    pub fn stream(&self, name: &str, params: Params) -> Result<StreamSession> {
        let url = stream_url(&self.config.endpoints, name)?;
        Ok(self.start(StreamRequest::post(url).with_params(params)))
    }

    /// Start a session for a fully specified request
    pub fn start(&self, request: StreamRequest) -> StreamSession {
        StreamSession::start(Arc::clone(&self.transport), request, &self.config.stream)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

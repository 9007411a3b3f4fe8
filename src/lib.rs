//! # Chirp - Streaming and Pagination Client Core
//!
//! The parts of a social-media API client that have to survive unreliable
//! networks and irregular data arrival:
//!
//! - **Streaming**: long-lived HTTP connections delivering newline-delimited
//!   JSON, decoded into discrete messages no matter how the bytes were
//!   chunked on the wire.
//! - **Cursor pagination**: multi-page collection endpoints presented as a
//!   single "fetch all" call.
//!
//! The REST surface itself (one URL template per endpoint) is plain
//! forwarding and lives on top of [`RestClient::get`] and
//! [`RestClient::post`].
//!
//! ## Architecture
//!
//! ```text
//!  Transport ──chunks──> FrameDecoder ──frames──> StreamSession ──events──> app
//!  (reqwest)             (codec)                  (stream)
//!
//!  CursorPaginator ──cursor=-1,100,50..──> PageFetcher (RestClient) ──> [a,b,c,...]
//!  (pagination)
//! ```
//!
//! ### Session State Machine
//!
//! ```text
//!     [Connecting] ──open ok──> [Active] ──end of body──> [Closed]
//!          │                       │  └──destroy()──> [Closing] ──> [Closed]
//!          └──error──────────────┴──error──────────────────────────> [Failed]
//! ```
//!
//! ### Error Classes
//!
//! | Error                         | Scope              | Effect                         |
//! |-------------------------------|--------------------|--------------------------------|
//! | `Decode`                      | one stream segment | reported, session continues    |
//! | `Transport`, `FrameOverflow`  | stream session     | session `Failed`               |
//! | `Http`, `Network`             | one REST call      | call (and cursor walk) fails   |
//! | `Pagination`                  | cursor walk        | walk fails, no partial result  |
//! | `Config`                      | before any I/O     | nothing sent                   |
//!
//! ## Quick Start
//!
//! ### Streaming
//!
//! ```rust,ignore
//! use chirp::{Config, StreamClient, StreamEvent};
//! use chirp::params::params;
//!
//! let client = StreamClient::new(Config::load(None)?)?;
//! let mut session = client.stream("filter", params([("track", "rust")]))?;
//!
//! while let Some(event) = session.next_event().await {
//!     match event {
//!         StreamEvent::Message(tweet) => println!("{}", tweet["text"]),
//!         StreamEvent::Error { error, .. } => eprintln!("{error}"),
//!         StreamEvent::End => break,
//!     }
//! }
//! ```
//!
//! ### Cursor Pagination
//!
//! ```rust,ignore
//! use chirp::{Config, RestClient};
//! use chirp::params::params;
//!
//! let rest = RestClient::new(&Config::load(None)?)?;
//! let ids = rest
//!     .get_using_cursor("/followers/ids.json", "ids", &params([("screen_name", "rustlang")]))
//!     .await?;
//! println!("{} followers", ids.len());
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: Newline-delimited JSON frame decoder
//! - [`transport`]: Streaming transport trait, HTTP and channel backends
//! - [`stream`]: Stream sessions, endpoint resolution, statistics
//! - [`pagination`]: Cursor paginator and the page fetcher trait
//! - [`rest`]: REST GET/POST forwarding
//! - [`params`]: Request parameter helpers
//! - [`config`]: Configuration management
//! - [`error`]: Error types and result aliases

pub mod codec;
pub mod config;
pub mod error;
pub mod pagination;
pub mod params;
pub mod rest;
pub mod stream;
pub mod transport;

// Re-exports for convenience
pub use codec::{Frame, FrameDecoder};
pub use config::Config;
pub use error::{ChirpError, ErrorClass, Result};
pub use pagination::{fetch_all, CursorPaginator, PageFetcher};
pub use params::Params;
pub use rest::RestClient;
pub use stream::{SessionHandle, SessionState, StreamClient, StreamEvent, StreamSession};
pub use transport::{ChannelTransport, HttpTransport, StreamRequest, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

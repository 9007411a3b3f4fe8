//! Chirp error types.
//!
//! # Error Classification
//!
//! Errors fall into the classes a caller has to treat differently:
//!
//! - **Scoped to one message**: [`ChirpError::Decode`] means a single stream
//!   segment was not valid JSON. The session keeps running.
//! - **Fatal to a session**: [`ChirpError::Transport`] and
//!   [`ChirpError::FrameOverflow`] end the stream; reconnecting is the
//!   caller's decision.
//! - **Fatal to an operation**: [`ChirpError::Http`], [`ChirpError::Network`]
//!   and [`ChirpError::Pagination`] abort a REST call or a whole cursor walk.
//! - **Raised before any I/O**: [`ChirpError::Config`].
//!
//! Graceful end of a stream is not an error and has no variant here.

use thiserror::Error;

/// Chirp errors.
#[derive(Error, Debug)]
pub enum ChirpError {
    /// A stream segment was not valid JSON.
    #[error("Decode error: {reason} (segment: {segment})")]
    Decode {
        /// The offending segment, truncated for display.
        segment: String,
        /// Parser message.
        reason: String,
    },

    /// The buffered partial frame grew past the configured cap.
    #[error("Frame overflow: {buffered} bytes buffered without a delimiter (limit {limit})")]
    FrameOverflow {
        /// Configured maximum frame size in bytes.
        limit: usize,
        /// Bytes held when the limit was crossed.
        buffered: usize,
    },

    /// Streaming connection failed (reset, DNS, TLS, rejected open).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status from a REST call.
    #[error("HTTP error {status}: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body as returned by the platform.
        body: String,
    },

    /// Network communication error outside a stream.
    #[error("Network error: {0}")]
    Network(String),

    /// A page could not be continued.
    #[error("Pagination error: {0}")]
    Pagination(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Chirp operations
pub type Result<T> = std::result::Result<T, ChirpError>;

/// How an error affects the stream session that observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The session stays active.
    NonFatal,
    /// The session has failed and will emit nothing further.
    Fatal,
}

impl ChirpError {
    /// Whether this error terminates a stream session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ChirpError::Decode { .. })
    }

    /// Session classification of this error.
    pub fn class(&self) -> ErrorClass {
        if self.is_fatal() {
            ErrorClass::Fatal
        } else {
            ErrorClass::NonFatal
        }
    }
}

impl From<reqwest::Error> for ChirpError {
    fn from(err: reqwest::Error) -> Self {
        ChirpError::Network(err.to_string())
    }
}

impl From<toml::de::Error> for ChirpError {
    fn from(err: toml::de::Error) -> Self {
        ChirpError::Config(err.to_string())
    }
}

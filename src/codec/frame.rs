//! Newline-delimited JSON framing for long-lived streaming responses.
//!
//! The platform streams one JSON document per line over a chunked HTTP body
//! and sends bare line breaks to keep idle connections open:
//!
//! ```text
//! {"id_str":"1","text":"first"}\r\n
//! \r\n
//! {"id_str":"2","text":"second"}\r\n
//! ```
//!
//! Chunk boundaries carry no meaning. A document may arrive split across
//! any number of chunks, and one chunk may complete several documents.

use bytes::BytesMut;
use serde_json::Value;

use crate::error::ChirpError;

/// Frame delimiter
pub const DELIMITER: u8 = b'\n';

/// Longest segment prefix quoted in a decode error
const SEGMENT_PREVIEW_CHARS: usize = 80;

/// Outcome of one complete, non-blank frame (or of a cap violation)
#[derive(Debug)]
pub enum Frame {
    /// A decoded JSON document
    Message(Value),
    /// A frame that produced an error instead of a message
    Invalid(ChirpError),
}

impl Frame {
    /// Get the message, if this frame decoded
    pub fn message(&self) -> Option<&Value> {
        match self {
            Frame::Message(value) => Some(value),
            Frame::Invalid(_) => None,
        }
    }

    /// Get the error, if this frame failed
    pub fn error(&self) -> Option<&ChirpError> {
        match self {
            Frame::Message(_) => None,
            Frame::Invalid(err) => Some(err),
        }
    }
}

/// Incremental decoder for newline-delimited JSON
///
/// Owns the frame buffer for exactly one stream. After every [`feed`] the
/// buffer holds only the bytes of the trailing, not yet delimited frame.
///
/// [`feed`]: FrameDecoder::feed
#[derive(Debug)]
pub struct FrameDecoder {
    /// Bytes of the incomplete trailing frame
    buffer: BytesMut,
    /// Prefix of `buffer` already known to contain no delimiter
    scanned: usize,
    /// Cap on the incomplete frame
    max_frame_bytes: Option<usize>,
    /// Dropping bytes up to the next delimiter after an overflow
    discarding: bool,
    /// Running counters
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with no frame size cap
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_frame_bytes: None,
            discarding: false,
            stats: DecoderStats::default(),
        }
    }

    /// Create a decoder that reports an overflow once an undelimited frame
    /// exceeds `max_frame_bytes`
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self::with_limit(Some(max_frame_bytes))
    }

    /// Create a decoder from an optional cap; `Some(0)` means no cap
    pub fn with_limit(max_frame_bytes: Option<usize>) -> Self {
        Self {
            max_frame_bytes: max_frame_bytes.filter(|&limit| limit > 0),
            ..Self::new()
        }
    }

    /// Append a chunk and extract every frame it completes
    ///
    /// Returns frames in stream order. Blank frames (keep-alives) produce
    /// nothing. A frame that is not valid JSON yields [`Frame::Invalid`] with
    /// [`ChirpError::Decode`] and does not affect the frames after it.
    ///
    /// If the trailing incomplete frame grows past the configured cap, the
    /// last element is [`Frame::Invalid`] with [`ChirpError::FrameOverflow`];
    /// the buffered bytes are dropped and the decoder skips input until the
    /// next delimiter.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.stats.chunks += 1;
        self.stats.bytes_in += chunk.len() as u64;

        let mut frames = Vec::new();
        let mut chunk = chunk;

        if self.discarding {
            match chunk.iter().position(|&b| b == DELIMITER) {
                Some(pos) => {
                    self.discarding = false;
                    chunk = &chunk[pos + 1..];
                },
                None => return frames,
            }
        }

        self.buffer.extend_from_slice(chunk);

        while let Some(offset) = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == DELIMITER)
        {
            let end = self.scanned + offset;
            let segment = self.buffer.split_to(end + 1);
            self.scanned = 0;

            if let Some(frame) = self.decode_segment(&segment[..end]) {
                frames.push(frame);
            }
        }
        self.scanned = self.buffer.len();

        if let Some(limit) = self.max_frame_bytes {
            if self.buffer.len() > limit {
                let buffered = self.buffer.len();
                tracing::warn!(limit, buffered, "Frame exceeded size cap, discarding");

                self.buffer.clear();
                self.scanned = 0;
                self.discarding = true;
                self.stats.overflows += 1;
                frames.push(Frame::Invalid(ChirpError::FrameOverflow { limit, buffered }));
            }
        }

        frames
    }

    /// Decode one delimited segment (delimiter already stripped)
    fn decode_segment(&mut self, segment: &[u8]) -> Option<Frame> {
        if segment.iter().all(u8::is_ascii_whitespace) {
            self.stats.keep_alives += 1;
            return None;
        }

        match serde_json::from_slice::<Value>(segment) {
            Ok(value) => {
                self.stats.messages += 1;
                tracing::trace!(bytes = segment.len(), "Decoded frame");
                Some(Frame::Message(value))
            },
            Err(e) => {
                self.stats.decode_errors += 1;
                tracing::debug!(bytes = segment.len(), error = %e, "Undecodable frame");
                Some(Frame::Invalid(ChirpError::Decode {
                    segment: preview(segment),
                    reason: e.to_string(),
                }))
            },
        }
    }

    /// Bytes of the incomplete trailing frame
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether the decoder holds no partial frame
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Configured frame size cap
    pub fn max_frame_bytes(&self) -> Option<usize> {
        self.max_frame_bytes
    }

    /// Get decoder statistics
    pub fn stats(&self) -> DecoderStats {
        self.stats.clone()
    }

    /// Drop any partial frame and reset counters
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.discarding = false;
        self.stats = DecoderStats::default();
    }
}

/// Lossy, truncated rendering of a segment for error messages
pub(crate) fn preview(segment: &[u8]) -> String {
    let text = String::from_utf8_lossy(segment);
    let text = text.trim();
    if text.chars().count() > SEGMENT_PREVIEW_CHARS {
        let cut: String = text.chars().take(SEGMENT_PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Statistics from frame decoding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Chunks fed
    pub chunks: u64,
    /// Total input bytes
    pub bytes_in: u64,
    /// Frames decoded into messages
    pub messages: u64,
    /// Blank frames skipped
    pub keep_alives: u64,
    /// Frames that failed to decode
    pub decode_errors: u64,
    /// Frame cap violations
    pub overflows: u64,
}

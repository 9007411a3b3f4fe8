//! Wire codec for the streaming surface.
//!
//! The streaming API delivers newline-delimited JSON over a chunked HTTP
//! body. [`FrameDecoder`] turns arbitrarily fragmented byte chunks back into
//! one decoded message per line.
//!
//! # Wire Format
//!
//! | Segment               | Meaning                          | Decoder output            |
//! |-----------------------|----------------------------------|---------------------------|
//! | `<json>\r\n`          | One application message          | [`Frame::Message`]        |
//! | `\r\n` (blank)        | Keep-alive                       | nothing                   |
//! | `<not json>\r\n`      | Corrupt segment                  | [`Frame::Invalid`]        |
//! | no delimiter (yet)    | Partial frame                    | held in the buffer        |
//!
//! # Usage
//!
//! ```rust
//! use chirp::codec::FrameDecoder;
//!
//! let mut decoder = FrameDecoder::new();
//! assert!(decoder.feed(b"{\"text\":\"hel").is_empty());
//!
//! let frames = decoder.feed(b"lo\"}\r\n\r\n");
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].message().unwrap()["text"], "hello");
//! assert!(decoder.is_empty());
//! ```

mod frame;

pub use frame::{DecoderStats, Frame, FrameDecoder, DELIMITER};
pub(crate) use frame::preview;

//! Per-session statistics tracking.
//!
//! Counters are updated by the session task and read from any handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Thread-safe session statistics
#[derive(Debug)]
pub struct SessionStats {
    /// Body chunks received
    chunks: AtomicU64,
    /// Body bytes received
    bytes_in: AtomicU64,
    /// Messages delivered
    messages: AtomicU64,
    /// Non-fatal decode errors delivered
    decode_errors: AtomicU64,
    /// Creation time
    started_at: Instant,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            chunks: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            messages: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record a received chunk
    pub fn record_chunk(&self, bytes: usize) {
        self.chunks.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a delivered message
    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered decode error
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time summary
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            chunks: self.chunks.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

/// Statistics summary for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    /// Body chunks received
    pub chunks: u64,
    /// Body bytes received
    pub bytes_in: u64,
    /// Messages delivered
    pub messages: u64,
    /// Decode errors delivered
    pub decode_errors: u64,
    /// Seconds since the session started
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let stats = SessionStats::new();

        stats.record_chunk(100);
        stats.record_chunk(50);
        stats.record_message();
        stats.record_decode_error();

        let summary = stats.summary();
        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.bytes_in, 150);
        assert_eq!(summary.messages, 1);
        assert_eq!(summary.decode_errors, 1);
    }
}

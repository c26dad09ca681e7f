//! Frame demultiplexer.
//!
//! Turns a byte stream delivered in arbitrary chunks into complete,
//! terminator-delimited frames. Bytes after the last terminator are kept
//! and joined with the next chunk.
//!
//! # Example
//!
//! ```
//! use rover_link::transport::FrameDemultiplexer;
//!
//! let mut demux = FrameDemultiplexer::new();
//! demux.push(b"E 10 2");
//! assert_eq!(demux.next_frame(), None);
//!
//! demux.push(b"0 ;\nS 5 ;");
//! let frames: Vec<String> = demux.frames().collect();
//! assert_eq!(frames, ["E 10 20", "S 5"]);
//! ```

// ============================================================================
// Imports
// ============================================================================

use tracing::trace;

use crate::protocol::TERMINATOR;

// ============================================================================
// Constants
// ============================================================================

/// Initial buffer capacity. The buffer grows as needed.
const DEFAULT_CAPACITY: usize = 4096;

// ============================================================================
// FrameDemultiplexer
// ============================================================================

/// Reassembles frames from a byte stream.
///
/// Frames are returned without their terminator and with surrounding
/// whitespace trimmed. Empty frames are skipped.
#[derive(Debug, Clone)]
pub struct FrameDemultiplexer {
    /// Received bytes not yet returned as frames.
    buffer: Vec<u8>,
    /// Start of the unconsumed region of `buffer`.
    start: usize,
    /// Offset from which to look for the next terminator. Everything
    /// between `start` and `scanned` is known to hold no terminator.
    scanned: usize,
}

impl Default for FrameDemultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDemultiplexer {
    /// Creates an empty demultiplexer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty demultiplexer with a starting buffer capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            start: 0,
            scanned: 0,
        }
    }

    /// Appends a received chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.start > 0 && self.start == self.buffer.len() {
            self.buffer.clear();
            self.start = 0;
            self.scanned = 0;
        }
        self.buffer.extend_from_slice(chunk);
    }

    /// Returns the next complete frame, if one is buffered.
    ///
    /// Can be called again after more data is pushed.
    pub fn next_frame(&mut self) -> Option<String> {
        loop {
            let offset = self.buffer[self.scanned..]
                .iter()
                .position(|&b| b == TERMINATOR);

            let Some(offset) = offset else {
                self.scanned = self.buffer.len();
                self.compact();
                return None;
            };

            let end = self.scanned + offset;
            let raw = &self.buffer[self.start..end];
            let frame = String::from_utf8_lossy(raw).trim().to_owned();

            self.start = end + 1;
            self.scanned = self.start;

            if !frame.is_empty() {
                trace!(len = frame.len(), "Frame complete");
                return Some(frame);
            }
        }
    }

    /// Iterates over all complete frames currently buffered.
    #[inline]
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { demux: self }
    }

    /// Number of buffered bytes that do not yet form a complete frame.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Discards any unterminated tail.
    ///
    /// Called when the connection goes away: a partial frame can never be
    /// completed. Returns the number of bytes dropped.
    pub fn reset(&mut self) -> usize {
        let dropped = self.pending();
        self.buffer.clear();
        self.start = 0;
        self.scanned = 0;
        dropped
    }

    /// Moves the unconsumed tail to the front of the buffer.
    fn compact(&mut self) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
    }
}

// ============================================================================
// Frames
// ============================================================================

/// Iterator returned by [`FrameDemultiplexer::frames`].
#[derive(Debug)]
pub struct Frames<'a> {
    demux: &'a mut FrameDemultiplexer,
}

impl Iterator for Frames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.demux.next_frame()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const STREAM: &[u8] = b"I 100.0 100.0 60000 1.0 10.0 5.0 30.0 45.0 ;\n\
        T 500 rl 12.5 8.0 90.0 3.0 b 20.0 20.0 1.0 ;\n\
        T 600 al 12.7 8.1 91.0 3.2 m -4.0 2.0 180.0 1.5 ;\n\
        K 700 ;\nE 700 1700 ;";

    fn collect_chunked(chunks: &[&[u8]]) -> Vec<String> {
        let mut demux = FrameDemultiplexer::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            demux.push(chunk);
            frames.extend(demux.frames());
        }
        frames
    }

    #[test]
    fn test_whole_stream() {
        let frames = collect_chunked(&[STREAM]);
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0], "I 100.0 100.0 60000 1.0 10.0 5.0 30.0 45.0");
        assert_eq!(frames[4], "E 700 1700");
    }

    #[test]
    fn test_every_split_offset_matches_whole_stream() {
        let expected = collect_chunked(&[STREAM]);
        for split in 0..=STREAM.len() {
            let (head, tail) = STREAM.split_at(split);
            assert_eq!(
                collect_chunked(&[head, tail]),
                expected,
                "split at byte {split}"
            );
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let chunks: Vec<&[u8]> = STREAM.chunks(1).collect();
        assert_eq!(collect_chunked(&chunks), collect_chunked(&[STREAM]));
    }

    #[test]
    fn test_partial_tail_is_carried() {
        let mut demux = FrameDemultiplexer::new();
        demux.push(b"S 10 ;K 2");
        assert_eq!(demux.next_frame().as_deref(), Some("S 10"));
        assert_eq!(demux.next_frame(), None);
        assert_eq!(demux.pending(), 3);

        demux.push(b"0 ;");
        assert_eq!(demux.next_frame().as_deref(), Some("K 20"));
        assert_eq!(demux.pending(), 0);
    }

    #[test]
    fn test_empty_frames_are_skipped() {
        let frames = collect_chunked(&[b";;  ;\n;S 1 ;;\n\n;E 1 2 ;"]);
        assert_eq!(frames, vec!["S 1", "E 1 2"]);
    }

    #[test]
    fn test_long_frame_is_not_truncated() {
        let mut frame = String::from("T 1 -- 0 0 0 0");
        for i in 0..2000 {
            frame.push_str(&format!(" b {i} {i} 1.0"));
        }
        let wire = format!("{frame} ;");

        let chunks: Vec<&[u8]> = wire.as_bytes().chunks(1023).collect();
        let frames = collect_chunked(&chunks);
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_reset_drops_tail() {
        let mut demux = FrameDemultiplexer::new();
        demux.push(b"T 1 -- 0 0");
        assert_eq!(demux.next_frame(), None);
        assert_eq!(demux.reset(), 10);
        assert_eq!(demux.pending(), 0);

        demux.push(b" 0 0 ;S 2 ;");
        assert_eq!(demux.next_frame().as_deref(), Some("0 0"));
        assert_eq!(demux.next_frame().as_deref(), Some("S 2"));
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let frames = collect_chunked(&[b"S \xff1 ;"]);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with("S "));
    }

    proptest! {
        #[test]
        fn prop_chunking_is_invisible(cuts in proptest::collection::vec(0..STREAM.len(), 0..16)) {
            let mut cuts = cuts;
            cuts.sort_unstable();
            cuts.dedup();

            let mut chunks = Vec::new();
            let mut last = 0;
            for cut in cuts {
                chunks.push(&STREAM[last..cut]);
                last = cut;
            }
            chunks.push(&STREAM[last..]);

            prop_assert_eq!(collect_chunked(&chunks), collect_chunked(&[STREAM]));
        }
    }
}

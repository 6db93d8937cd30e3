//! Marker search, frame-boundary detection and garbage discard.
//!
//! The reassembler is driven purely by buffer content. Each call to
//! [`Reassembler::poll_event`] walks the conceptual states
//! seeking-sync → awaiting-length → awaiting-payload → frame-ready as far as
//! the buffered bytes allow, and returns at most one event. It never waits
//! for input: when more bytes are needed it returns `Ok(None)` and the caller
//! feeds the next chunk.
//!
//! Bytes ahead of the first marker are dropped as soon as they are known not
//! to start one. Only a trailing `0xBE` is held back, since the matching `0xEF`
//! may arrive in the next chunk. A candidate is extracted only once all of
//! `4 + 2·length + 2` bytes are buffered, so the sequence of decoded frames
//! does not depend on how the stream was chunked.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::codec::{decode_frame, frame_len, FrameConfig, HEADER_SIZE, MARKER};
use crate::error::{FrameError, MalformedReason, Result};
use crate::event::FrameEvent;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Running counters for one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblerStats {
    pub bytes_received: u64,
    pub frames_decoded: u64,
    pub checksum_mismatches: u64,
    pub malformed_frames: u64,
    pub noise_bytes: u64,
    pub incomplete_frames: u64,
    pub overflows: u64,
}

/// Incremental frame reassembler for one byte stream.
#[derive(Debug)]
pub struct Reassembler {
    buf: BytesMut,
    config: FrameConfig,
    stats: ReassemblerStats,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Create a reassembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a reassembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            stats: ReassemblerStats::default(),
        }
    }

    /// Append a chunk to the buffer without extracting anything.
    pub fn push(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.stats.bytes_received += chunk.len() as u64;
        self.buf.extend_from_slice(chunk);
    }

    /// Append an owned chunk, avoiding a copy when the buffer is empty.
    #[cfg(feature = "async")]
    pub(crate) fn push_owned(&mut self, chunk: BytesMut) {
        if chunk.is_empty() {
            return;
        }
        self.stats.bytes_received += chunk.len() as u64;
        self.buf.unsplit(chunk);
    }

    /// Produce the next event the buffered bytes allow, if any.
    ///
    /// Returns `Ok(None)` when more input is needed. Returns
    /// [`FrameError::BufferOverflow`] when more than `max_buffer_size` bytes
    /// are held with nothing extractable; the buffer is cleared in that case.
    pub fn poll_event(&mut self) -> Result<Option<FrameEvent>> {
        if let Some(event) = self.next_event() {
            return Ok(Some(event));
        }

        let buffered = self.buf.len();
        let max = self.config.max_buffer_size;
        if buffered > max {
            warn!(buffered, max, "reassembly buffer overflow, dropping buffered bytes");
            self.buf.clear();
            self.stats.overflows += 1;
            return Err(FrameError::BufferOverflow { buffered, max });
        }

        Ok(None)
    }

    /// Append a chunk and return every event it completes, in order.
    ///
    /// On `BufferOverflow` the events produced earlier in the same call are
    /// dropped with it; use [`Reassembler::feed_with`] to observe them.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<FrameEvent>> {
        let mut events = Vec::new();
        self.feed_with(chunk, |event| events.push(event))?;
        Ok(events)
    }

    /// Append a chunk and hand every completed event to `sink`, in order.
    pub fn feed_with<F>(&mut self, chunk: &[u8], mut sink: F) -> Result<()>
    where
        F: FnMut(FrameEvent),
    {
        self.push(chunk);
        while let Some(event) = self.poll_event()? {
            sink(event);
        }
        Ok(())
    }

    /// Drain everything at end-of-stream, one event per call.
    ///
    /// Complete candidates are still extracted first. Whatever remains is
    /// reported as `Incomplete` if it starts with a marker, otherwise as noise.
    /// Returns `None` once the buffer is empty.
    pub fn poll_finish(&mut self) -> Option<FrameEvent> {
        loop {
            if let Some(event) = self.next_event() {
                return Some(event);
            }
            if self.buf.is_empty() {
                return None;
            }
            if let Some(event) = self.flush_remainder() {
                return Some(event);
            }
        }
    }

    /// Flush on end-of-stream and return the trailing events.
    pub fn finish(&mut self) -> Vec<FrameEvent> {
        std::iter::from_fn(|| self.poll_finish()).collect()
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> &ReassemblerStats {
        &self.stats
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Drop buffered bytes and counters, keeping the configuration.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.stats = ReassemblerStats::default();
    }

    fn next_event(&mut self) -> Option<FrameEvent> {
        loop {
            match find_marker(&self.buf) {
                Some(0) => {}
                Some(idx) => {
                    let noise = self.buf.split_to(idx).freeze();
                    match self.discard_noise(noise) {
                        Some(event) => return Some(event),
                        None => continue,
                    }
                }
                None => {
                    // A trailing 0xBE may be the first half of a split marker.
                    let keep = usize::from(self.buf.last() == Some(&MARKER[0]));
                    let drop = self.buf.len() - keep;
                    if drop == 0 {
                        return None;
                    }
                    let noise = self.buf.split_to(drop).freeze();
                    return self.discard_noise(noise);
                }
            }

            if self.buf.len() < HEADER_SIZE {
                trace!(buffered = self.buf.len(), "awaiting length field");
                return None;
            }

            let items = u16::from_be_bytes([self.buf[2], self.buf[3]]);
            let max = self.config.max_payload_items;
            if items > max {
                let raw = Bytes::copy_from_slice(&self.buf[..HEADER_SIZE]);
                self.buf.advance(MARKER.len());
                self.stats.malformed_frames += 1;
                debug!(items, max, "length field exceeds limit, resyncing");
                return Some(FrameEvent::Malformed {
                    reason: MalformedReason::LengthExceedsLimit { items, max },
                    raw,
                });
            }

            let total = frame_len(items);
            if self.buf.len() < total {
                trace!(buffered = self.buf.len(), total, "awaiting payload");
                return None;
            }

            let raw = self.buf.split_to(total).freeze();
            let event = FrameEvent::from(decode_frame(raw));
            self.record(&event);
            return Some(event);
        }
    }

    fn discard_noise(&mut self, noise: Bytes) -> Option<FrameEvent> {
        self.stats.noise_bytes += noise.len() as u64;
        trace!(len = noise.len(), "discarding noise");
        self.config
            .report_noise
            .then_some(FrameEvent::NoiseDiscarded(noise))
    }

    fn flush_remainder(&mut self) -> Option<FrameEvent> {
        let rest = self.buf.split().freeze();
        if !rest.starts_with(&MARKER) {
            return self.discard_noise(rest);
        }
        self.stats.incomplete_frames += 1;
        debug!(len = rest.len(), "stream ended inside a frame");
        self.config
            .report_incomplete
            .then_some(FrameEvent::Incomplete(rest))
    }

    fn record(&mut self, event: &FrameEvent) {
        match event {
            FrameEvent::Decoded(frame) => {
                self.stats.frames_decoded += 1;
                debug!(items = frame.payload.len(), "frame decoded");
            }
            FrameEvent::ChecksumMismatch {
                expected, received, ..
            } => {
                self.stats.checksum_mismatches += 1;
                debug!(
                    expected = format_args!("{expected:#06x}"),
                    received = format_args!("{received:#06x}"),
                    "checksum mismatch"
                );
            }
            FrameEvent::Malformed { reason, .. } => {
                self.stats.malformed_frames += 1;
                debug!(%reason, "malformed frame");
            }
            FrameEvent::NoiseDiscarded(_) | FrameEvent::Incomplete(_) => {}
        }
    }
}

fn find_marker(buf: &[u8]) -> Option<usize> {
    buf.windows(MARKER.len()).position(|w| w == MARKER)
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;
    use crate::checksum::checksum;
    use crate::codec::encode;

    fn payloads(events: &[FrameEvent]) -> Vec<Vec<u16>> {
        events
            .iter()
            .filter_map(|e| e.frame().map(|f| f.payload.clone()))
            .collect()
    }

    fn feed_in_chunks(stream: &[u8], size: usize) -> Vec<FrameEvent> {
        let mut r = Reassembler::new();
        let mut events = Vec::new();
        for chunk in stream.chunks(size) {
            events.extend(r.feed(chunk).unwrap());
        }
        events.extend(r.finish());
        events
    }

    #[test]
    fn single_frame_one_chunk() {
        let wire = encode(&[1, 2, 3]).unwrap();
        let mut r = Reassembler::new();
        let events = r.feed(&wire).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(payloads(&events), vec![vec![1, 2, 3]]);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn single_frame_byte_at_a_time() {
        let wire = encode(&[1, 2, 3]).unwrap();
        let mut r = Reassembler::new();
        let mut events = Vec::new();
        for (i, b) in wire.iter().enumerate() {
            let out = r.feed(std::slice::from_ref(b)).unwrap();
            if i + 1 < wire.len() {
                assert!(out.is_empty(), "premature event at byte {i}");
            }
            events.extend(out);
        }
        assert_eq!(payloads(&events), vec![vec![1, 2, 3]]);
    }

    #[test]
    fn back_to_back_frames_in_one_chunk() {
        let mut stream = BytesMut::new();
        for p in [&[1u16][..], &[2, 3], &[], &[4, 5, 6]] {
            stream.put_slice(&encode(p).unwrap());
        }
        let events = Reassembler::new().feed(&stream).unwrap();
        assert_eq!(
            payloads(&events),
            vec![vec![1], vec![2, 3], vec![], vec![4, 5, 6]]
        );
    }

    #[test]
    fn leading_noise_is_reported_then_frame() {
        let mut stream = vec![0x01, 0x02, 0x03];
        stream.extend_from_slice(&encode(&[9]).unwrap());
        let events = Reassembler::new().feed(&stream).unwrap();
        assert_eq!(
            events[0],
            FrameEvent::NoiseDiscarded(Bytes::from_static(&[0x01, 0x02, 0x03]))
        );
        assert_eq!(payloads(&events), vec![vec![9]]);
    }

    #[test]
    fn marker_split_across_chunks() {
        let wire = encode(&[0x1111]).unwrap();
        let mut r = Reassembler::new();

        let first = r.feed(&[0x10, 0x20, wire[0]]).unwrap();
        assert_eq!(
            first,
            vec![FrameEvent::NoiseDiscarded(Bytes::from_static(&[0x10, 0x20]))]
        );
        assert_eq!(r.buffered(), 1);

        let second = r.feed(&wire[1..]).unwrap();
        assert_eq!(payloads(&second), vec![vec![0x1111]]);
    }

    #[test]
    fn noise_only_never_decodes_and_stays_small() {
        let noise: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8 & 0x7F).collect();
        let mut r = Reassembler::new();
        let mut events = Vec::new();
        for chunk in noise.chunks(13) {
            events.extend(r.feed(chunk).unwrap());
            assert!(r.buffered() <= 1);
        }
        events.extend(r.finish());
        assert!(payloads(&events).is_empty());
        assert_eq!(r.stats().noise_bytes, noise.len() as u64);
    }

    #[test]
    fn trailing_marker_byte_is_held_back() {
        let mut r = Reassembler::new();
        let events = r.feed(&[0x00, 0xBE]).unwrap();
        assert_eq!(
            events,
            vec![FrameEvent::NoiseDiscarded(Bytes::from_static(&[0x00]))]
        );
        assert_eq!(r.buffered(), 1);

        let tail = r.finish();
        assert_eq!(
            tail,
            vec![FrameEvent::NoiseDiscarded(Bytes::from_static(&[0xBE]))]
        );
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn repeated_marker_byte_before_sync() {
        let mut stream = vec![0xBE];
        stream.extend_from_slice(&encode(&[3]).unwrap());
        let events = Reassembler::new().feed(&stream).unwrap();
        assert_eq!(
            events[0],
            FrameEvent::NoiseDiscarded(Bytes::from_static(&[0xBE]))
        );
        assert_eq!(payloads(&events), vec![vec![3]]);
    }

    #[test]
    fn resync_after_noise_between_frames() {
        let mut stream = vec![0x00, 0x13, 0x37];
        stream.extend_from_slice(&encode(&[0xAAAA, 1]).unwrap());
        stream.extend_from_slice(&[0x42, 0xBE, 0x00]);
        stream.extend_from_slice(&encode(&[0xBBBB]).unwrap());

        for size in [1, 2, 5, 8, stream.len()] {
            let events = feed_in_chunks(&stream, size);
            assert_eq!(
                payloads(&events),
                vec![vec![0xAAAA, 1], vec![0xBBBB]],
                "chunk size {size}"
            );
        }
    }

    #[test]
    fn corrupted_frame_is_reported_and_next_frame_survives() {
        let mut bad = encode(&[1, 2, 3]).unwrap().to_vec();
        bad[6] ^= 0x04;
        let mut stream = bad.clone();
        stream.extend_from_slice(&encode(&[4]).unwrap());

        let mut r = Reassembler::new();
        let events = r.feed(&stream).unwrap();
        assert_eq!(events.len(), 2);
        match &events[0] {
            FrameEvent::ChecksumMismatch { raw, received, .. } => {
                assert_eq!(raw.as_ref(), bad.as_slice());
                assert_eq!(*received, u16::from_be_bytes([bad[10], bad[11]]));
            }
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
        assert_eq!(payloads(&events), vec![vec![4]]);
        assert_eq!(r.stats().checksum_mismatches, 1);
        assert_eq!(r.stats().frames_decoded, 1);
    }

    #[test]
    fn false_marker_in_noise_yields_mismatch() {
        let header = [0xBE, 0xEF, 0x00, 0x00];
        let wrong = checksum(&header) ^ 0x0101;
        let mut stream = header.to_vec();
        stream.extend_from_slice(&wrong.to_be_bytes());
        stream.extend_from_slice(&encode(&[77]).unwrap());

        let events = Reassembler::new().feed(&stream).unwrap();
        assert!(matches!(events[0], FrameEvent::ChecksumMismatch { .. }));
        assert_eq!(payloads(&events), vec![vec![77]]);
    }

    #[test]
    fn partial_tail_is_incomplete_on_finish() {
        let b = encode(&[5, 6, 7]).unwrap();
        let mut stream = encode(&[1]).unwrap().to_vec();
        stream.extend_from_slice(&b[..7]);

        let mut r = Reassembler::new();
        let events = r.feed(&stream).unwrap();
        assert_eq!(payloads(&events), vec![vec![1]]);
        assert_eq!(r.buffered(), 7);

        let tail = r.finish();
        assert_eq!(tail, vec![FrameEvent::Incomplete(b.slice(..7))]);
        assert_eq!(r.stats().incomplete_frames, 1);
    }

    #[test]
    fn incomplete_can_be_silenced() {
        let cfg = FrameConfig {
            report_incomplete: false,
            ..FrameConfig::default()
        };
        let mut r = Reassembler::with_config(cfg);
        r.feed(&encode(&[1, 2]).unwrap()[..5]).unwrap();
        assert!(r.finish().is_empty());
        assert_eq!(r.stats().incomplete_frames, 1);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn noise_can_be_silenced_but_is_counted() {
        let cfg = FrameConfig {
            report_noise: false,
            ..FrameConfig::default()
        };
        let mut stream = vec![1, 2, 3, 4];
        stream.extend_from_slice(&encode(&[8]).unwrap());
        stream.push(0xBE);

        let mut r = Reassembler::with_config(cfg);
        let mut events = r.feed(&stream).unwrap();
        events.extend(r.finish());
        assert_eq!(events.len(), 1);
        assert_eq!(payloads(&events), vec![vec![8]]);
        assert_eq!(r.stats().noise_bytes, 5);
    }

    #[test]
    fn length_over_limit_is_malformed_and_resyncs() {
        let cfg = FrameConfig {
            max_payload_items: 16,
            ..FrameConfig::default()
        };
        let mut stream = vec![0xBE, 0xEF, 0xFF, 0xFF];
        stream.extend_from_slice(&encode(&[0x0102]).unwrap());

        let mut r = Reassembler::with_config(cfg);
        let events = r.feed(&stream).unwrap();
        assert_eq!(
            events[0],
            FrameEvent::Malformed {
                reason: MalformedReason::LengthExceedsLimit {
                    items: 0xFFFF,
                    max: 16
                },
                raw: Bytes::from_static(&[0xBE, 0xEF, 0xFF, 0xFF]),
            }
        );
        assert_eq!(
            events[1],
            FrameEvent::NoiseDiscarded(Bytes::from_static(&[0xFF, 0xFF]))
        );
        assert_eq!(payloads(&events), vec![vec![0x0102]]);
        assert_eq!(r.stats().malformed_frames, 1);
    }

    #[test]
    fn buffer_overflow_is_fatal_and_clears() {
        let cfg = FrameConfig {
            max_buffer_size: 16,
            ..FrameConfig::default()
        };
        let mut stream = vec![0xBE, 0xEF, 0x00, 0x64];
        stream.extend_from_slice(&[0u8; 20]);

        let mut r = Reassembler::with_config(cfg);
        let err = r.feed(&stream).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BufferOverflow {
                buffered: 24,
                max: 16
            }
        ));
        assert_eq!(r.buffered(), 0);
        assert_eq!(r.stats().overflows, 1);

        let events = r.feed(&encode(&[1]).unwrap()).unwrap();
        assert_eq!(payloads(&events), vec![vec![1]]);
    }

    #[test]
    fn feed_with_delivers_in_order() {
        let mut stream = encode(&[1]).unwrap().to_vec();
        stream.extend_from_slice(&encode(&[2]).unwrap());
        let mut seen = Vec::new();
        Reassembler::new()
            .feed_with(&stream, |event| seen.push(event.into_frame().unwrap().payload))
            .unwrap();
        assert_eq!(seen, vec![vec![1], vec![2]]);
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut r = Reassembler::new();
        assert!(r.feed(&[]).unwrap().is_empty());
        assert_eq!(r.stats().bytes_received, 0);
    }

    #[test]
    fn finish_extracts_pushed_frames_first() {
        let mut r = Reassembler::new();
        r.push(&encode(&[1, 1]).unwrap());
        r.push(&[0xBE, 0xEF, 0x00]);
        let events = r.finish();
        assert_eq!(payloads(&events), vec![vec![1, 1]]);
        assert_eq!(
            events.last(),
            Some(&FrameEvent::Incomplete(Bytes::from_static(&[0xBE, 0xEF, 0x00])))
        );
    }

    #[test]
    fn reset_clears_buffer_and_stats() {
        let mut r = Reassembler::new();
        r.feed(&[0xBE, 0xEF, 0x00]).unwrap();
        r.reset();
        assert_eq!(r.buffered(), 0);
        assert_eq!(*r.stats(), ReassemblerStats::default());
    }
}

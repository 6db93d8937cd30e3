//! Random test streams: frames interleaved with short noise bursts.
//!
//! Each frame is preceded by 1-4 random noise bytes and, with probability
//! [`StreamSpec::trailing_noise`], followed by another burst. Frames can be
//! corrupted after encoding to exercise checksum detection.

use std::ops::RangeInclusive;

use bytes::{BufMut, Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use syncframe_frame::{encode_frame, MARKER};

/// Length range of a single noise burst.
pub const NOISE_LEN: RangeInclusive<usize> = 1..=4;

pub const DEFAULT_FRAMES: usize = 10;
pub const DEFAULT_ITEMS: u16 = 6;
pub const DEFAULT_TRAILING_NOISE: f64 = 0.3;

/// Shape of a generated stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSpec {
    /// Number of frames to emit.
    pub frames: usize,
    /// Payload items per frame.
    pub items: u16,
    /// Probability of a second noise burst after a frame.
    pub trailing_noise: f64,
    /// Probability that a frame gets one byte flipped after encoding.
    pub corrupt: f64,
    /// Keep `0xBE` out of noise so no false markers can appear.
    pub marker_free_noise: bool,
    /// RNG seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for StreamSpec {
    fn default() -> Self {
        Self {
            frames: DEFAULT_FRAMES,
            items: DEFAULT_ITEMS,
            trailing_noise: DEFAULT_TRAILING_NOISE,
            corrupt: 0.0,
            marker_free_noise: false,
            seed: None,
        }
    }
}

/// A generated stream plus what went into it.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub stream: Bytes,
    /// Payload of every frame, in stream order.
    pub payloads: Vec<Vec<u16>>,
    /// Indices into `payloads` of frames that were corrupted.
    pub corrupted: Vec<usize>,
}

impl Fixture {
    /// Payloads that should decode cleanly.
    pub fn intact_payloads(&self) -> Vec<Vec<u16>> {
        self.payloads
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.corrupted.contains(i))
            .map(|(_, p)| p.clone())
            .collect()
    }
}

/// Random payload of `items` values, encoded as a frame.
pub fn make_frame<R: Rng + ?Sized>(rng: &mut R, items: u16, dst: &mut BytesMut) -> Vec<u16> {
    let payload: Vec<u16> = (0..items).map(|_| rng.gen()).collect();
    encode_frame(&payload, dst).expect("a u16 item count is always within MAX_ITEMS");
    payload
}

/// 1-4 random bytes.
pub fn make_noise<R: Rng + ?Sized>(rng: &mut R, marker_free: bool) -> Vec<u8> {
    let len = rng.gen_range(NOISE_LEN);
    (0..len)
        .map(|_| loop {
            let b: u8 = rng.gen();
            if !marker_free || b != MARKER[0] {
                break b;
            }
        })
        .collect()
}

/// Build a stream according to `spec`.
pub fn generate(spec: &StreamSpec) -> Fixture {
    let mut rng = match spec.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut stream = BytesMut::new();
    let mut payloads = Vec::with_capacity(spec.frames);
    let mut corrupted = Vec::new();

    for index in 0..spec.frames {
        stream.put_slice(&make_noise(&mut rng, spec.marker_free_noise));

        let start = stream.len();
        payloads.push(make_frame(&mut rng, spec.items, &mut stream));

        if spec.corrupt > 0.0 && rng.gen_bool(spec.corrupt.min(1.0)) {
            // Flip inside the payload (or the checksum for empty frames);
            // the marker and length field stay intact.
            let at = start + rng.gen_range(4..stream.len() - start);
            stream[at] ^= rng.gen_range(1..=u8::MAX);
            corrupted.push(index);
        }

        if spec.trailing_noise > 0.0 && rng.gen_bool(spec.trailing_noise.min(1.0)) {
            stream.put_slice(&make_noise(&mut rng, spec.marker_free_noise));
        }
    }

    Fixture {
        stream: stream.freeze(),
        payloads,
        corrupted,
    }
}

#[cfg(test)]
mod tests {
    use syncframe_frame::{frame_len, FrameEvent, Reassembler};

    use super::*;

    fn clean_spec(seed: u64) -> StreamSpec {
        StreamSpec {
            marker_free_noise: true,
            seed: Some(seed),
            ..StreamSpec::default()
        }
    }

    #[test]
    fn make_frame_handles_largest_item_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut dst = BytesMut::new();
        let payload = make_frame(&mut rng, u16::MAX, &mut dst);
        assert_eq!(payload.len(), usize::from(u16::MAX));
        assert_eq!(dst.len(), frame_len(u16::MAX));
        assert_eq!(&dst[2..4], &[0xFF, 0xFF]);
    }

    #[test]
    fn noise_lengths_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let noise = make_noise(&mut rng, true);
            assert!(NOISE_LEN.contains(&noise.len()));
            assert!(!noise.contains(&0xBE));
        }
    }

    #[test]
    fn make_frame_encodes_requested_items() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut buf = BytesMut::new();
        let payload = make_frame(&mut rng, 6, &mut buf);
        assert_eq!(payload.len(), 6);
        assert_eq!(buf.len(), frame_len(6));
        assert_eq!(&buf[..2], &MARKER);
    }

    #[test]
    fn seeded_streams_are_reproducible() {
        let a = generate(&clean_spec(42));
        let b = generate(&clean_spec(42));
        assert_eq!(a.stream, b.stream);
        assert_eq!(a.payloads, b.payloads);
    }

    #[test]
    fn generated_stream_decodes_to_its_payloads() {
        let fixture = generate(&StreamSpec {
            frames: 25,
            ..clean_spec(7)
        });
        let mut r = Reassembler::new();
        let mut frames = Vec::new();
        for chunk in fixture.stream.chunks(8) {
            for event in r.feed(chunk).unwrap() {
                if let Some(frame) = event.into_frame() {
                    frames.push(frame.into_payload());
                }
            }
        }
        assert!(r.finish().iter().all(|e| e.frame().is_none()));
        assert_eq!(frames, fixture.payloads);
    }

    #[test]
    fn corrupted_frames_become_mismatches() {
        let fixture = generate(&StreamSpec {
            frames: 40,
            corrupt: 0.5,
            ..clean_spec(9)
        });
        assert!(!fixture.corrupted.is_empty());

        let events = Reassembler::new().feed(&fixture.stream).unwrap();
        let mismatches = events
            .iter()
            .filter(|e| matches!(e, FrameEvent::ChecksumMismatch { .. }))
            .count();
        let frames: Vec<_> = events
            .into_iter()
            .filter_map(|e| e.into_frame().map(|f| f.into_payload()))
            .collect();

        assert_eq!(mismatches, fixture.corrupted.len());
        assert_eq!(frames, fixture.intact_payloads());
    }

    #[test]
    fn empty_frames_corrupt_the_checksum() {
        let fixture = generate(&StreamSpec {
            frames: 5,
            items: 0,
            corrupt: 1.0,
            ..clean_spec(3)
        });
        assert_eq!(fixture.corrupted.len(), 5);
        let events = Reassembler::new().feed(&fixture.stream).unwrap();
        assert!(events.iter().all(|e| e.frame().is_none()));
    }
}

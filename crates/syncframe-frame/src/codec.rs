use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::checksum;
use crate::error::{DecodeError, FrameError, MalformedReason, Result};

/// Frame start marker.
pub const MARKER: [u8; 2] = [0xBE, 0xEF];

/// Marker (2) + length field (2).
pub const HEADER_SIZE: usize = 4;

/// Trailing checksum field.
pub const CHECKSUM_SIZE: usize = 2;

/// Bytes per payload item.
pub const ITEM_SIZE: usize = 2;

/// Largest item count the length field can carry.
pub const MAX_ITEMS: u16 = u16::MAX;

/// Smallest possible frame: empty payload.
pub const MIN_FRAME_LEN: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Largest possible frame on the wire.
pub const MAX_FRAME_LEN: usize = frame_len(MAX_ITEMS);

/// Default cap on buffered-but-unconsumed bytes: 1 MiB.
pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024;

/// Default number of bytes requested per source read.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Total wire length of a frame carrying `items` payload items.
pub const fn frame_len(items: u16) -> usize {
    HEADER_SIZE + ITEM_SIZE * items as usize + CHECKSUM_SIZE
}

/// A validated frame.
///
/// Only [`Frame::new`] and [`decode_frame`] build frames, so the payload never
/// exceeds [`MAX_ITEMS`] and the length field always matches it.
///
/// ```compile_fail
/// let frame = syncframe_frame::Frame { payload: vec![7; 65536], checksum: 0 };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub(crate) payload: Vec<u16>,
    pub(crate) checksum: u16,
}

impl Frame {
    /// Build a frame from payload items, computing its checksum.
    pub fn new(payload: impl Into<Vec<u16>>) -> Result<Self> {
        let payload = payload.into();
        let mut buf = BytesMut::with_capacity(frame_len_for(payload.len()));
        let checksum = encode_frame(&payload, &mut buf)?;
        Ok(Self { payload, checksum })
    }

    /// Payload items, in wire order.
    pub fn payload(&self) -> &[u16] {
        &self.payload
    }

    /// Checksum carried by (or computed for) the frame.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn into_payload(self) -> Vec<u16> {
        self.payload
    }

    /// Number of payload items, as carried in the length field.
    pub fn length(&self) -> u16 {
        debug_assert!(self.payload.len() <= MAX_ITEMS as usize);
        self.payload.len() as u16
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        frame_len(self.length())
    }

    /// Serialize the frame back into wire format.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        put_unchecked(&self.payload, &mut buf);
        buf.put_u16(self.checksum);
        buf.freeze()
    }
}

fn frame_len_for(items: usize) -> usize {
    HEADER_SIZE + ITEM_SIZE * items + CHECKSUM_SIZE
}

fn put_unchecked(payload: &[u16], dst: &mut BytesMut) {
    dst.put_slice(&MARKER);
    dst.put_u16(payload.len() as u16);
    for &item in payload {
        dst.put_u16(item);
    }
}

/// Encode a payload into the wire format, appending to `dst`.
///
/// Wire format (all fields big-endian):
/// ```text
/// ┌─────────────┬─────────────┬──────────────────┬──────────────┐
/// │ Marker (2B) │ Length (2B) │ Payload          │ CRC (2B)     │
/// │ 0xBE 0xEF   │ item count  │ (Length × u16)   │ CCITT-FALSE  │
/// └─────────────┴─────────────┴──────────────────┴──────────────┘
/// ```
///
/// Returns the checksum written at the tail.
pub fn encode_frame(payload: &[u16], dst: &mut BytesMut) -> Result<u16> {
    if payload.len() > MAX_ITEMS as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_ITEMS as usize,
        });
    }
    dst.reserve(frame_len_for(payload.len()));
    let start = dst.len();
    put_unchecked(payload, dst);
    let crc = checksum(&dst[start..]);
    dst.put_u16(crc);
    Ok(crc)
}

/// Encode a payload into a fresh buffer.
pub fn encode(payload: &[u16]) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    encode_frame(payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Decode exactly one candidate frame.
///
/// `raw` must span the whole candidate: marker, length field, payload, and
/// checksum. Never panics on arbitrary input; every failure carries `raw`.
pub fn decode_frame(raw: Bytes) -> std::result::Result<Frame, DecodeError> {
    if raw.len() < MIN_FRAME_LEN {
        return Err(DecodeError::Malformed {
            reason: MalformedReason::TooShort { len: raw.len() },
            raw,
        });
    }

    if raw[0..2] != MARKER {
        return Err(DecodeError::Malformed {
            reason: MalformedReason::BadMarker {
                found: [raw[0], raw[1]],
            },
            raw,
        });
    }

    let items = u16::from_be_bytes([raw[2], raw[3]]);
    let expected = frame_len(items);
    if raw.len() != expected {
        return Err(DecodeError::Malformed {
            reason: MalformedReason::LengthMismatch {
                items,
                expected,
                actual: raw.len(),
            },
            raw,
        });
    }

    let body_end = expected - CHECKSUM_SIZE;
    let received = u16::from_be_bytes([raw[body_end], raw[body_end + 1]]);
    let computed = checksum(&raw[..body_end]);
    if computed != received {
        return Err(DecodeError::ChecksumMismatch {
            expected: computed,
            received,
            raw,
        });
    }

    let payload = raw[HEADER_SIZE..body_end]
        .chunks_exact(ITEM_SIZE)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    Ok(Frame {
        payload,
        checksum: received,
    })
}

/// Decode a candidate from a borrowed slice (copies it).
pub fn decode(raw: &[u8]) -> std::result::Result<Frame, DecodeError> {
    decode_frame(Bytes::copy_from_slice(raw))
}

/// Limits and reporting switches shared by the reassembler, reader and writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Length fields above this are reported as malformed. Default: 65535.
    pub max_payload_items: u16,
    /// Maximum bytes held while waiting for a frame to complete. Default: 1 MiB.
    pub max_buffer_size: usize,
    /// Bytes requested per source read. Default: 8 KiB.
    pub read_chunk_size: usize,
    /// Emit `NoiseDiscarded` events. Default: true.
    pub report_noise: bool,
    /// Emit `Incomplete` for a dangling frame at end-of-stream. Default: true.
    pub report_incomplete: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_items: MAX_ITEMS,
            max_buffer_size: DEFAULT_MAX_BUFFER,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            report_noise: true,
            report_incomplete: true,
        }
    }
}

use bytes::Bytes;

/// Operational errors: encoding limits, resource exhaustion, and source I/O.
///
/// Per-candidate integrity problems are not errors at this level; they are
/// reported as [`DecodeError`] values inside frame events.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum item count.
    #[error("payload too large ({size} items, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The reassembly buffer grew past its configured limit.
    #[error("reassembly buffer overflow ({buffered} bytes buffered, max {max})")]
    BufferOverflow { buffered: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a complete frame was received.
    #[error("connection closed (no further frames)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Why a candidate frame could not be parsed structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// Fewer bytes than the smallest possible frame.
    TooShort { len: usize },
    /// The first two bytes are not the frame marker.
    BadMarker { found: [u8; 2] },
    /// The length field disagrees with the number of bytes supplied.
    LengthMismatch {
        items: u16,
        expected: usize,
        actual: usize,
    },
    /// The length field exceeds the configured item limit.
    LengthExceedsLimit { items: u16, max: u16 },
}

impl std::fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { len } => write!(f, "too short ({len} bytes)"),
            Self::BadMarker { found } => {
                write!(f, "bad marker 0x{:02x}{:02x}", found[0], found[1])
            }
            Self::LengthMismatch {
                items,
                expected,
                actual,
            } => write!(
                f,
                "length field says {items} items ({expected} bytes), got {actual} bytes"
            ),
            Self::LengthExceedsLimit { items, max } => {
                write!(f, "length field {items} exceeds limit {max}")
            }
        }
    }
}

/// A candidate frame that failed validation.
///
/// The raw candidate bytes are kept in every variant for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Structurally valid, but the transmitted checksum is wrong.
    #[error("checksum mismatch: computed {expected:#06x}, received {received:#06x}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
        raw: Bytes,
    },

    /// The candidate could not be parsed.
    #[error("malformed frame: {reason}")]
    Malformed { reason: MalformedReason, raw: Bytes },
}

impl DecodeError {
    /// The offending candidate bytes.
    pub fn raw(&self) -> &Bytes {
        match self {
            Self::ChecksumMismatch { raw, .. } | Self::Malformed { raw, .. } => raw,
        }
    }
}

use bytes::Bytes;

use crate::codec::Frame;
use crate::error::{DecodeError, MalformedReason};

/// One outcome produced by the reassembler, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A candidate passed structural and checksum validation.
    Decoded(Frame),
    /// A structurally valid candidate with the wrong checksum.
    ChecksumMismatch {
        expected: u16,
        received: u16,
        raw: Bytes,
    },
    /// A candidate that could not be parsed.
    Malformed { reason: MalformedReason, raw: Bytes },
    /// Bytes dropped while searching for a marker.
    NoiseDiscarded(Bytes),
    /// A partial frame left over at end-of-stream.
    Incomplete(Bytes),
}

impl FrameEvent {
    /// Short, stable name for logs and machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decoded(_) => "frame",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
            Self::Malformed { .. } => "malformed",
            Self::NoiseDiscarded(_) => "noise",
            Self::Incomplete(_) => "incomplete",
        }
    }

    /// The decoded frame, if this event carries one.
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            Self::Decoded(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Decoded(frame) => Some(frame),
            _ => None,
        }
    }

    /// True for checksum and malformed-frame events.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. } | Self::Malformed { .. })
    }

    /// Raw bytes attached to the event. `None` for decoded frames.
    pub fn raw(&self) -> Option<&Bytes> {
        match self {
            Self::Decoded(_) => None,
            Self::ChecksumMismatch { raw, .. }
            | Self::Malformed { raw, .. }
            | Self::NoiseDiscarded(raw)
            | Self::Incomplete(raw) => Some(raw),
        }
    }
}

impl From<DecodeError> for FrameEvent {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::ChecksumMismatch {
                expected,
                received,
                raw,
            } => Self::ChecksumMismatch {
                expected,
                received,
                raw,
            },
            DecodeError::Malformed { reason, raw } => Self::Malformed { reason, raw },
        }
    }
}

impl From<std::result::Result<Frame, DecodeError>> for FrameEvent {
    fn from(result: std::result::Result<Frame, DecodeError>) -> Self {
        match result {
            Ok(frame) => Self::Decoded(frame),
            Err(err) => err.into(),
        }
    }
}

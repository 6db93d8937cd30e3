//! Marker-synchronized, CRC-protected frame reassembly for noisy byte streams.
//!
//! This is the core of syncframe. Every frame on the wire is:
//! - A 2-byte marker (`0xBE 0xEF`) for stream synchronization
//! - A 2-byte big-endian count of payload items
//! - The payload: that many big-endian `u16` items
//! - A 2-byte big-endian CRC-16/CCITT-FALSE over everything before it
//!
//! Frames may be surrounded by noise and split across any number of reads.
//! The [`Reassembler`] turns arbitrary chunks into an ordered stream of
//! [`FrameEvent`]s: decoded frames, checksum mismatches, malformed candidates,
//! discarded noise, and a trailing incomplete frame at end-of-stream.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod event;
pub mod reader;
pub mod reassembler;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use checksum::{checksum, Crc16};
pub use codec::{
    decode, decode_frame, encode, encode_frame, frame_len, Frame, FrameConfig, HEADER_SIZE,
    MARKER, MAX_FRAME_LEN, MAX_ITEMS,
};
pub use error::{DecodeError, FrameError, MalformedReason, Result};
pub use event::FrameEvent;
pub use reader::FrameReader;
pub use reassembler::{Reassembler, ReassemblerStats};
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::SyncFrameCodec;

//! Resynchronizing decoder for marker-framed, CRC-protected serial streams.
//!
//! syncframe recovers `0xBEEF`-marked, length-prefixed frames from byte
//! streams that carry noise, arbitrary read boundaries, and corruption.
//!
//! # Crate Structure
//!
//! - [`frame`]: checksum, codec and the stream reassembler
//! - [`fixture`]: random frame/noise stream generation (behind the `fixture` feature)

/// Re-export frame types.
pub mod frame {
    pub use syncframe_frame::*;
}

#[cfg(feature = "fixture")]
pub mod fixture;

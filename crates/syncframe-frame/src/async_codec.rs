//! `tokio_util` codec adapter (requires the `async` feature).

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::event::FrameEvent;
use crate::reassembler::{Reassembler, ReassemblerStats};

/// Decodes a noisy byte stream into [`FrameEvent`]s and encodes payloads
/// into frames.
///
/// Incoming bytes are moved out of the framed read buffer into the inner
/// reassembler on every `decode` call, so partial frames survive across reads.
#[derive(Debug, Default)]
pub struct SyncFrameCodec {
    reassembler: Reassembler,
}

impl SyncFrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            reassembler: Reassembler::with_config(config),
        }
    }

    pub fn stats(&self) -> &ReassemblerStats {
        self.reassembler.stats()
    }
}

impl Decoder for SyncFrameCodec {
    type Item = FrameEvent;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<FrameEvent>> {
        self.reassembler.push_owned(src.split());
        self.reassembler.poll_event()
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<FrameEvent>> {
        self.reassembler.push_owned(src.split());
        Ok(self.reassembler.poll_finish())
    }
}

impl Encoder<&[u16]> for SyncFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, payload: &[u16], dst: &mut BytesMut) -> Result<()> {
        let max = self.reassembler.config().max_payload_items as usize;
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            });
        }
        encode_frame(payload, dst).map(|_| ())
    }
}

impl Encoder<Frame> for SyncFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        Encoder::<&[u16]>::encode(self, &frame.payload, dst)
    }
}

use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::event::FrameEvent;
use crate::reassembler::{Reassembler, ReassemblerStats};

/// Pulls chunks from any `Read` source and yields frame events in order.
///
/// Handles partial reads internally. Short reads, split markers and frames
/// spanning many reads are all absorbed by the inner [`Reassembler`].
pub struct FrameReader<T> {
    inner: T,
    reassembler: Reassembler,
    chunk: Vec<u8>,
    eof: bool,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        let chunk = vec![0u8; config.read_chunk_size.max(1)];
        Self {
            inner,
            reassembler: Reassembler::with_config(config),
            chunk,
            eof: false,
        }
    }

    /// Next event in stream order (blocking on the source as needed).
    ///
    /// Returns `Ok(None)` once the source is exhausted and the trailing
    /// events have been drained. Source errors are returned verbatim;
    /// only `Interrupted` reads are retried.
    pub fn next_event(&mut self) -> Result<Option<FrameEvent>> {
        loop {
            if self.eof {
                return Ok(self.reassembler.poll_finish());
            }

            if let Some(event) = self.reassembler.poll_event()? {
                return Ok(Some(event));
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                debug!(buffered = self.reassembler.buffered(), "source exhausted");
                self.eof = true;
                continue;
            }

            self.reassembler.push(&self.chunk[..read]);
        }
    }

    /// Read the next valid frame, skipping every other event.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when the source is exhausted.
    pub fn read_frame(&mut self) -> Result<Frame> {
        while let Some(event) = self.next_event()? {
            if let FrameEvent::Decoded(frame) = event {
                return Ok(frame);
            }
        }
        Err(FrameError::ConnectionClosed)
    }

    /// Pump the source to exhaustion, handing every event to `sink`.
    pub fn run<F>(&mut self, mut sink: F) -> Result<ReassemblerStats>
    where
        F: FnMut(FrameEvent),
    {
        while let Some(event) = self.next_event()? {
            sink(event);
        }
        Ok(*self.reassembler.stats())
    }

    /// True once the source has returned end-of-stream.
    pub fn is_exhausted(&self) -> bool {
        self.eof
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Counters for the stream so far.
    pub fn stats(&self) -> &ReassemblerStats {
        self.reassembler.stats()
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.reassembler.config()
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<FrameEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

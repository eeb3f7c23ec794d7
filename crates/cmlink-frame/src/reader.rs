use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use cmlink_transport::IpcStream;
use tracing::warn;

use crate::codec::{decode_frame, peek_len, Frame, FrameConfig, PREFIX_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// After reporting an oversized inbound frame the reader skips that frame's
/// payload, so the next call decodes the frame after it.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    /// Payload bytes of a rejected frame still to be dropped.
    discard: usize,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            discard: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Fails with [`FrameError::EndOfStream`] when the stream ends between
    /// frames and [`FrameError::Truncated`] when it ends inside one.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if self.discard > 0 {
                let n = self.discard.min(self.buf.len());
                self.buf.advance(n);
                self.discard -= n;
            }

            if self.discard == 0 {
                match decode_frame(&mut self.buf, self.config.max_payload_size) {
                    Ok(Some(frame)) => return Ok(frame),
                    Ok(None) => {}
                    Err(FrameError::PayloadTooLarge { size, max }) => {
                        warn!(size, max, "skipping oversized inbound frame");
                        self.buf.advance(PREFIX_SIZE);
                        self.discard = size;
                        return Err(FrameError::PayloadTooLarge { size, max });
                    }
                    Err(err) => return Err(err),
                }
            }

            self.fill()?;
        }
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(self.eof_error()),
                Ok(n) => {
                    // The buffer is empty whenever a discard is pending.
                    let skipped = self.discard.min(n);
                    self.discard -= skipped;
                    self.buf.extend_from_slice(&chunk[skipped..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    fn eof_error(&self) -> FrameError {
        if self.discard > 0 {
            return FrameError::Truncated {
                expected: self.discard,
                received: 0,
            };
        }
        match peek_len(&self.buf) {
            _ if self.buf.is_empty() => FrameError::EndOfStream,
            Some(len) => FrameError::Truncated {
                expected: PREFIX_SIZE + len,
                received: self.buf.len(),
            },
            None => FrameError::Truncated {
                expected: PREFIX_SIZE,
                received: self.buf.len(),
            },
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<IpcStream> {
    /// Create a frame reader for `IpcStream` and apply the configured read timeout.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: cmlink_transport::TransportError) -> FrameError {
    match err {
        cmlink_transport::TransportError::Io(io) => FrameError::Io(io),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

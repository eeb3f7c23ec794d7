use std::io::{self, ErrorKind, Write};

use bytes::BytesMut;
use cmlink_transport::IpcStream;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameConfig, PREFIX_SIZE};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
///
/// A frame is either rejected before any byte is written or written whole,
/// unless the stream's write timeout expires part way. A blocking socket
/// reports an expired `SO_SNDTIMEO` as `WouldBlock`; that surfaces as an
/// `Io` error of kind `TimedOut` and the partial frame is left on the wire.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete frame and flush (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.as_ref())
    }

    /// Encode, write and flush one payload.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let size = PREFIX_SIZE + payload.len();
        if size > self.config.send_limit {
            return Err(FrameError::FrameTooLarge {
                size,
                limit: self.config.send_limit,
            });
        }

        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Err(write_timed_out(offset, self.buf.len()))
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        trace!(size, "frame written");

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    return Err(FrameError::Io(io::Error::new(
                        ErrorKind::TimedOut,
                        "flush timed out",
                    )))
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the per-frame send limit (prefix included).
    pub fn set_send_limit(&mut self, send_limit: usize) {
        self.config.send_limit = send_limit;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

fn write_timed_out(written: usize, total: usize) -> FrameError {
    FrameError::Io(io::Error::new(
        ErrorKind::TimedOut,
        format!("write timed out after {written} of {total} bytes"),
    ))
}

impl FrameWriter<IpcStream> {
    /// Create a frame writer for `IpcStream` and apply the configured write timeout.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

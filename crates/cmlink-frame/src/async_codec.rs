//! `tokio_util::codec` adapter for the same wire format.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, peek_len, Frame, FrameConfig, PREFIX_SIZE};
use crate::error::{FrameError, Result};

/// Length-prefixed codec for `Framed` / `FramedRead` / `FramedWrite`.
#[derive(Debug, Clone)]
pub struct LengthPrefixedCodec {
    max_payload_size: usize,
    send_limit: usize,
    discard: usize,
}

impl LengthPrefixedCodec {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
            send_limit: config.send_limit,
            discard: 0,
        }
    }
}

impl Default for LengthPrefixedCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LengthPrefixedCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if self.discard > 0 {
            let n = self.discard.min(src.len());
            src.advance(n);
            self.discard -= n;
            if self.discard > 0 {
                return Ok(None);
            }
        }

        match decode_frame(src, self.max_payload_size) {
            Err(FrameError::PayloadTooLarge { size, max }) => {
                src.advance(PREFIX_SIZE);
                self.discard = size;
                Err(FrameError::PayloadTooLarge { size, max })
            }
            other => other,
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if self.discard > 0 {
            return Err(FrameError::Truncated {
                expected: self.discard,
                received: 0,
            });
        }
        match peek_len(src) {
            _ if src.is_empty() => Ok(None),
            Some(len) => Err(FrameError::Truncated {
                expected: PREFIX_SIZE + len,
                received: src.len(),
            }),
            None => Err(FrameError::Truncated {
                expected: PREFIX_SIZE,
                received: src.len(),
            }),
        }
    }
}

impl Encoder<Bytes> for LengthPrefixedCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        let size = PREFIX_SIZE + item.len();
        if size > self.send_limit {
            return Err(FrameError::FrameTooLarge {
                size,
                limit: self.send_limit,
            });
        }
        encode_frame(&item, dst)
    }
}

impl Encoder<Frame> for LengthPrefixedCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        Encoder::<Bytes>::encode(self, item.payload, dst)
    }
}

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Length prefix: 4 bytes, big-endian.
pub const PREFIX_SIZE: usize = 4;

/// Largest payload a peer using signed 32-bit lengths can express.
pub const MAX_WIRE_PAYLOAD: usize = i32::MAX as usize;

/// Default maximum inbound payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Default outbound budget per frame, prefix included: 1 MiB.
///
/// Matches the send buffer the daemon configures on its control socket, so
/// a frame within this limit never stalls the writer for long.
pub const DEFAULT_SEND_LIMIT: usize = 1024 * 1024;

/// One opaque message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub payload: Bytes,
}

impl Frame {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Bytes this frame occupies on the wire (prefix + payload).
    pub fn wire_size(&self) -> usize {
        PREFIX_SIZE + self.payload.len()
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.payload.as_ref()
    }
}

impl From<Bytes> for Frame {
    fn from(payload: Bytes) -> Self {
        Self { payload }
    }
}

impl From<Vec<u8>> for Frame {
    fn from(payload: Vec<u8>) -> Self {
        Self::new(payload)
    }
}

impl From<&'static [u8]> for Frame {
    fn from(payload: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(payload))
    }
}

/// Encode a payload into the wire format.
///
/// ```text
/// ┌──────────────────┬─────────────────────┐
/// │ Length (4B BE)   │ Payload (Length B)  │
/// └──────────────────┴─────────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_WIRE_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_WIRE_PAYLOAD,
        });
    }
    dst.reserve(PREFIX_SIZE + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one frame from the front of `src`.
///
/// Returns `Ok(None)` while the buffer holds less than a complete frame.
/// An oversized declared length is reported without consuming anything.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    let Some(payload_len) = peek_len(src) else {
        return Ok(None);
    };

    let max = max_payload.min(MAX_WIRE_PAYLOAD);
    if payload_len > max {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max,
        });
    }

    if src.len() < PREFIX_SIZE + payload_len {
        return Ok(None);
    }

    src.advance(PREFIX_SIZE);
    let payload = src.split_to(payload_len).freeze();
    Ok(Some(Frame { payload }))
}

/// The declared payload length, if the prefix is complete.
pub(crate) fn peek_len(src: &[u8]) -> Option<usize> {
    let prefix: [u8; PREFIX_SIZE] = src.get(..PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(prefix) as usize)
}

/// Configuration shared by [`crate::FrameReader`] and [`crate::FrameWriter`].
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest inbound payload accepted. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Largest outbound frame, prefix included. Default: 1 MiB.
    pub send_limit: usize,
    /// Read timeout applied to socket streams. Default: none.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to socket streams. Default: none.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            send_limit: DEFAULT_SEND_LIMIT,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_big_endian_length() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();

        assert_eq!(&buf[..PREFIX_SIZE], &[0, 0, 0, 5]);
        assert_eq!(&buf[PREFIX_SIZE..], b"hello");
    }

    #[test]
    fn decode_consumes_exactly_one_frame() {
        let mut buf = BytesMut::new();
        encode_frame(b"first", &mut buf).unwrap();
        encode_frame(b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(f1.as_ref(), b"first");
        assert_eq!(buf.len(), PREFIX_SIZE + 6);

        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(f2.as_ref(), b"second");
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_complete_prefix() {
        let mut buf = BytesMut::from(&[0x00, 0x00, 0x01][..]);
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn decode_waits_for_complete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(b"hello", &mut buf).unwrap();
        buf.truncate(PREFIX_SIZE + 2);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
        assert_eq!(buf.len(), PREFIX_SIZE + 2);
    }

    #[test]
    fn oversized_declared_length_is_rejected_without_consuming() {
        let mut buf = BytesMut::new();
        buf.put_u32(1024);

        let err = decode_frame(&mut buf, 16).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge {
                size: 1024,
                max: 16
            }
        ));
        assert_eq!(buf.len(), PREFIX_SIZE);
    }

    #[test]
    fn negative_signed_length_is_oversized() {
        let mut buf = BytesMut::new();
        buf.put_u32(0x8000_0000);

        let err = decode_frame(&mut buf, usize::MAX).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { max, .. } if max == MAX_WIRE_PAYLOAD
        ));
    }

    #[test]
    fn empty_payload_is_a_frame() {
        let mut buf = BytesMut::new();
        encode_frame(b"", &mut buf).unwrap();
        assert_eq!(buf.len(), PREFIX_SIZE);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn wire_size_counts_prefix() {
        let frame = Frame::from(&b"test"[..]);
        assert_eq!(frame.wire_size(), PREFIX_SIZE + 4);
    }
}

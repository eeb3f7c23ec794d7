//! Length-prefixed framing for the cmlink control channel.
//!
//! Every message on the wire is:
//! - a 4-byte big-endian payload length
//! - that many opaque payload bytes
//!
//! There is no magic number, version byte or checksum. Callers always get
//! whole frames; partial reads are handled here.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::LengthPrefixedCodec;
pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, DEFAULT_SEND_LIMIT,
    MAX_WIRE_PAYLOAD, PREFIX_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;

use std::io::ErrorKind;

/// Errors that can occur while encoding, decoding or moving frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An inbound frame declares more payload than the reader accepts.
    #[error("inbound payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An outbound frame (prefix included) exceeds the send limit.
    #[error("frame too large to send ({size} bytes, limit {limit})")]
    FrameTooLarge { size: usize, limit: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream on a frame boundary.
    #[error("end of stream")]
    EndOfStream,

    /// The stream ended inside a length prefix or a payload.
    #[error("stream truncated mid-frame ({received} of {expected} bytes)")]
    Truncated { expected: usize, received: usize },
}

impl FrameError {
    /// True when no further frame can ever be read from the stream.
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            Self::EndOfStream | Self::Truncated { .. } => true,
            Self::Io(err) => matches!(
                err.kind(),
                ErrorKind::UnexpectedEof
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

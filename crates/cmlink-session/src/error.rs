use std::time::Duration;

use cmlink_frame::FrameError;
use cmlink_transport::TransportError;

/// Boxed error returned by message handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The channel could not be established.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error: oversize, I/O, truncation or end of stream.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The registered message handler rejected a frame.
    #[error("message handler failed: {0}")]
    Handler(#[source] BoxError),

    /// The session reached its terminal state; nothing more can be sent or received.
    #[error("session closed")]
    Closed,

    /// No correlated response arrived within the configured deadline.
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),

    /// A worker thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },
}

impl SessionError {
    /// True when the error means the channel is gone for good.
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            Self::Frame(err) => err.is_end_of_stream(),
            Self::Closed => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

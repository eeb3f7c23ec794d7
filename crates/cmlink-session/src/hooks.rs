//! Collaborators plugged into the worker loops.

use std::fmt;

use cmlink_frame::Frame;
use tracing::{error, warn};

use crate::error::{BoxError, SessionError};

/// Which worker loop produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The outbound drain loop or a synchronous send.
    Sender,
    /// The inbound read loop.
    Receiver,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Sender => f.write_str("sender"),
            Origin::Receiver => f.write_str("receiver"),
        }
    }
}

/// Receives every error the background loops swallow.
///
/// `on_error` is called for recoverable failures; the loop keeps going.
/// `on_closed` is called exactly once, when the peer closes the stream and
/// the session becomes unusable. Deciding whether to exit or reconnect is
/// left to the implementor.
pub trait SessionObserver: Send + Sync {
    fn on_error(&self, origin: Origin, err: &SessionError);

    fn on_closed(&self, err: &SessionError) {
        let _ = err;
    }
}

/// Default observer: logs through `tracing` and lets the loops continue.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn on_error(&self, origin: Origin, err: &SessionError) {
        warn!(%origin, error = %err, "session loop error");
    }

    fn on_closed(&self, err: &SessionError) {
        error!(error = %err, "control channel closed; session is unusable");
    }
}

/// Invoked on the receiver thread for every inbound frame, in arrival order.
///
/// Handlers must return quickly or hand work off; a slow handler delays
/// decoding of everything behind it.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, frame: &Frame) -> Result<(), BoxError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Frame) -> Result<(), BoxError> + Send + Sync,
{
    fn handle(&self, frame: &Frame) -> Result<(), BoxError> {
        self(frame)
    }
}

/// Handler for sessions that only use request/response correlation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl MessageHandler for NoopHandler {
    fn handle(&self, _frame: &Frame) -> Result<(), BoxError> {
        Ok(())
    }
}

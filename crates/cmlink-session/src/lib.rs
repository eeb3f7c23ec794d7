//! Full-duplex message session over one control channel.
//!
//! A [`Session`] owns two worker threads: a sender that drains a bounded
//! outbound queue and a receiver that decodes inbound frames in order. On
//! top of that, [`Coordinator`] turns the channel into a blocking
//! request/response exchange by capturing the first frame that arrives
//! after a request was armed.

pub mod connector;
pub mod coordinator;
pub mod error;
pub mod hooks;
pub mod marker;
pub mod queue;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod state;

mod shared;

#[cfg(test)]
mod test_support;

pub use cmlink_frame::Frame;
pub use connector::{connect, connect_with, connect_with_config};
pub use coordinator::Coordinator;
pub use error::{BoxError, Result, SessionError};
pub use hooks::{LoggingObserver, MessageHandler, NoopHandler, Origin, SessionObserver};
pub use marker::MarkerSlot;
pub use queue::{FrameQueue, DEFAULT_QUEUE_CAPACITY};
pub use receiver::Receiver;
pub use sender::Sender;
pub use session::{Session, SessionConfig};
pub use state::SessionState;

//! Client for the container management daemon's control socket.
//!
//! cmlink speaks length-prefixed frames over a Unix domain socket, runs a
//! full-duplex session with blocking request/response correlation on top,
//! and exposes the daemon's container commands as typed calls.
//!
//! # Crate Structure
//!
//! - [`transport`]: socket connect/bind and the connected byte stream
//! - [`frame`]: 4-byte big-endian length-prefixed framing
//! - [`session`]: sender/receiver threads, marker correlation, coordinator
//! - [`control`]: container start/stop/switch/status commands

/// Re-export transport types.
pub mod transport {
    pub use cmlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cmlink_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use cmlink_session::*;
}

/// Re-export container control types.
pub mod control {
    pub use cmlink_control::*;
}

pub use cmlink_control::{Communicator, CommunicatorConfig};
pub use cmlink_session::{connect, connect_with_config, Session, SessionConfig};

//! Channel provider for cmlink.
//!
//! Hands the upper layers one already-connected, ordered, reliable byte
//! stream ([`IpcStream`]). Everything above this crate only reads and writes
//! bytes; connecting, binding and peer inspection live here.

pub mod error;
pub mod stream;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use stream::{IpcStream, PeerCredentials};

#[cfg(unix)]
pub use uds::UnixDomainSocket;

/// Control socket path used by the container management daemon.
pub const DEFAULT_SOCKET_PATH: &str = "/dev/socket/cml-control";

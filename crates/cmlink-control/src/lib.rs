//! Container management facade over a cmlink session.
//!
//! Encodes `ControllerToDaemon` commands as JSON frames, sends them through
//! a [`cmlink_session::Session`] and decodes the daemon's
//! `DaemonToController` answers into typed results.

pub mod communicator;
pub mod error;
pub mod messages;

pub use communicator::{Communicator, CommunicatorConfig, DEFAULT_HIDDEN_NAMES};
pub use error::{ControlError, Result};
pub use messages::{
    Command, ContainerConfig, ContainerItem, ContainerStartParams, ContainerState,
    ContainerStatus, ControllerToDaemon, DaemonToController, Response,
};

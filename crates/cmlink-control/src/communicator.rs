use std::path::Path;

use cmlink_session::{Session, SessionConfig};
use cmlink_transport::IpcStream;
use tracing::debug;

use crate::error::{ControlError, Result};
use crate::messages::{
    ContainerConfig, ContainerItem, ContainerState, ControllerToDaemon, DaemonToController,
    Response,
};

/// Container names left out of [`Communicator::containers`] by default.
/// `a0` is the privileged root container.
pub const DEFAULT_HIDDEN_NAMES: &[&str] = &["a0"];

/// Communicator behavior configuration.
#[derive(Debug, Clone)]
pub struct CommunicatorConfig {
    pub session: SessionConfig,
    /// Names skipped when listing containers.
    pub hidden_names: Vec<String>,
}

impl Default for CommunicatorConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            hidden_names: DEFAULT_HIDDEN_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Typed container management commands over one control session.
///
/// Start, status and config calls are synchronous exchanges; stop and
/// switch are queued and return without waiting for the daemon.
pub struct Communicator {
    session: Session,
    hidden_names: Vec<String>,
}

impl Communicator {
    /// Connect to the daemon control socket.
    pub fn connect(path: impl AsRef<Path>, config: CommunicatorConfig) -> Result<Self> {
        let session = cmlink_session::connect_with_config(path, config.session)?;
        Ok(Self {
            session,
            hidden_names: config.hidden_names,
        })
    }

    /// Run over an already-connected stream.
    pub fn from_stream(stream: IpcStream, config: CommunicatorConfig) -> Result<Self> {
        let session = Session::from_stream(stream, config.session)?;
        Ok(Self {
            session,
            hidden_names: config.hidden_names,
        })
    }

    /// Wrap an existing session.
    pub fn from_session(session: Session, hidden_names: Vec<String>) -> Self {
        Self {
            session,
            hidden_names,
        }
    }

    /// Unlock and start a container.
    pub fn start_container(&self, uuid: &str, key: &str) -> Result<()> {
        debug!(uuid, "starting container");
        let reply = self.exchange(&ControllerToDaemon::start(uuid, key))?;
        match reply.response {
            Some(Response::ContainerStartPasswdWrong) => Err(ControlError::WrongPassword),
            Some(Response::ContainerStartLockedTillReboot) => Err(ControlError::LockedTillReboot),
            Some(Response::ContainerStartLockFailed | Response::ContainerStartUnlockFailed) => {
                Err(ControlError::Smartcard)
            }
            _ => Ok(()),
        }
    }

    /// Ask the daemon to stop a container. Does not wait for an answer.
    pub fn stop_container(&self, uuid: &str) -> Result<()> {
        debug!(uuid, "stopping container");
        self.post(&ControllerToDaemon::stop(uuid))
    }

    /// Bring a container to the foreground. Does not wait for an answer.
    pub fn switch_to(&self, uuid: &str) -> Result<()> {
        debug!(uuid, "switching container");
        self.post(&ControllerToDaemon::switch(uuid))
    }

    pub fn container_state(&self, uuid: &str) -> Result<ContainerState> {
        let reply = self.exchange(&ControllerToDaemon::status(uuid))?;
        reply
            .container_status
            .into_iter()
            .next()
            .map(|status| status.state)
            .ok_or(ControlError::MissingStatus)
    }

    pub fn container_config(&self, uuid: &str) -> Result<ContainerConfig> {
        let reply = self.exchange(&ControllerToDaemon::config(uuid))?;
        reply
            .container_configs
            .into_iter()
            .next()
            .ok_or(ControlError::MissingConfig)
    }

    /// All containers the daemon reports, minus the hidden ones.
    pub fn containers(&self) -> Result<Vec<ContainerItem>> {
        let reply = self.exchange(&ControllerToDaemon::status_all())?;
        let items: Vec<ContainerItem> = reply
            .container_status
            .iter()
            .filter(|status| !self.hidden_names.iter().any(|hidden| *hidden == status.name))
            .map(ContainerItem::from)
            .collect();
        debug!(
            reported = reply.container_status.len(),
            listed = items.len(),
            "container list received"
        );
        Ok(items)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Flush queued commands and close the session.
    pub fn shutdown(&self) {
        self.session.shutdown();
    }

    fn exchange(&self, msg: &ControllerToDaemon) -> Result<DaemonToController> {
        let response = self.session.request(msg.encode()?)?;
        DaemonToController::decode(response.as_ref())
    }

    fn post(&self, msg: &ControllerToDaemon) -> Result<()> {
        self.session.post(msg.encode()?)?;
        Ok(())
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Command codes understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ContainerStart,
    ContainerStop,
    ContainerSwitch,
    GetContainerStatus,
    GetContainerConfig,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::ContainerStart => "container_start",
            Command::ContainerStop => "container_stop",
            Command::ContainerSwitch => "container_switch",
            Command::GetContainerStatus => "get_container_status",
            Command::GetContainerConfig => "get_container_config",
        };
        f.write_str(name)
    }
}

/// Parameters for [`Command::ContainerStart`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStartParams {
    pub key: String,
}

impl fmt::Debug for ContainerStartParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerStartParams")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// One message from the controller to the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerToDaemon {
    pub command: Command,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_uuids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_start_params: Option<ContainerStartParams>,
}

impl ControllerToDaemon {
    fn for_container(command: Command, uuid: &str) -> Self {
        Self {
            command,
            container_uuids: vec![uuid.to_string()],
            container_start_params: None,
        }
    }

    pub fn start(uuid: &str, key: &str) -> Self {
        Self {
            container_start_params: Some(ContainerStartParams {
                key: key.to_string(),
            }),
            ..Self::for_container(Command::ContainerStart, uuid)
        }
    }

    pub fn stop(uuid: &str) -> Self {
        Self::for_container(Command::ContainerStop, uuid)
    }

    pub fn switch(uuid: &str) -> Self {
        Self::for_container(Command::ContainerSwitch, uuid)
    }

    pub fn status(uuid: &str) -> Self {
        Self::for_container(Command::GetContainerStatus, uuid)
    }

    /// Status request without a uuid: the daemon reports every container.
    pub fn status_all() -> Self {
        Self {
            command: Command::GetContainerStatus,
            container_uuids: Vec::new(),
            container_start_params: None,
        }
    }

    pub fn config(uuid: &str) -> Self {
        Self::for_container(Command::GetContainerConfig, uuid)
    }

    /// Serialize to the frame payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Response codes the daemon attaches to command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    ContainerStartOk,
    ContainerStartPasswdWrong,
    ContainerStartLockedTillReboot,
    ContainerStartLockFailed,
    ContainerStartUnlockFailed,
    /// Any code this client does not know.
    #[serde(other)]
    Other,
}

/// Lifecycle state of a container as reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    Stopped,
    Starting,
    Booting,
    Running,
    Freezing,
    Frozen,
    Zombie,
    ShuttingDown,
    Setup,
    Rebooting,
    #[serde(other)]
    Unknown,
}

impl ContainerState {
    /// Everything except [`ContainerState::Stopped`] counts as running.
    pub fn is_running(self) -> bool {
        self != ContainerState::Stopped
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerState::Stopped => "stopped",
            ContainerState::Starting => "starting",
            ContainerState::Booting => "booting",
            ContainerState::Running => "running",
            ContainerState::Freezing => "freezing",
            ContainerState::Frozen => "frozen",
            ContainerState::Zombie => "zombie",
            ContainerState::ShuttingDown => "shutting_down",
            ContainerState::Setup => "setup",
            ContainerState::Rebooting => "rebooting",
            ContainerState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub uuid: String,
    pub name: String,
    pub state: ContainerState,
}

/// Container configuration. Fields this client does not model are kept in
/// `extra` so they survive a round trip to JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One message from the daemon to the controller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DaemonToController {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Response>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_status: Vec<ContainerStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_configs: Vec<ContainerConfig>,
}

impl DaemonToController {
    /// Parse a frame payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Summary row for one container, as listed by
/// [`Communicator::containers`](crate::Communicator::containers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerItem {
    pub uuid: String,
    pub name: String,
    pub running: bool,
}

impl From<&ContainerStatus> for ContainerItem {
    fn from(status: &ContainerStatus) -> Self {
        Self {
            uuid: status.uuid.clone(),
            name: status.name.clone(),
            running: status.state.is_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn start_request_shape() {
        let msg = ControllerToDaemon::start("c-1", "secret");
        let value: serde_json::Value = serde_json::from_slice(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "command": "container_start",
                "container_uuids": ["c-1"],
                "container_start_params": { "key": "secret" }
            })
        );
    }

    #[test]
    fn status_all_omits_uuids() {
        let value = serde_json::to_value(ControllerToDaemon::status_all()).unwrap();
        assert_eq!(value, json!({ "command": "get_container_status" }));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let rendered = format!("{:?}", ControllerToDaemon::start("c-1", "hunter2"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn unknown_codes_do_not_fail_decoding() {
        let reply = DaemonToController::decode(
            br#"{
                "response": "something_new",
                "container_status": [{ "uuid": "u", "name": "n", "state": "hibernating" }]
            }"#,
        )
        .unwrap();
        assert_eq!(reply.response, Some(Response::Other));
        assert_eq!(reply.container_status[0].state, ContainerState::Unknown);
    }

    #[test]
    fn config_keeps_unmodelled_fields() {
        let reply = DaemonToController::decode(
            br#"{ "container_configs": [{ "name": "a1", "color": 255, "ram_limit": 1024 }] }"#,
        )
        .unwrap();
        let config = &reply.container_configs[0];
        assert_eq!(config.color, Some(255));
        assert_eq!(config.extra.get("ram_limit"), Some(&json!(1024)));
    }

    #[test]
    fn running_means_not_stopped() {
        assert!(!ContainerState::Stopped.is_running());
        assert!(ContainerState::Starting.is_running());
        assert!(ContainerState::Frozen.is_running());
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(
            DaemonToController::decode(b"\x00\x01not json"),
            Err(crate::ControlError::Json(_))
        ));
    }
}

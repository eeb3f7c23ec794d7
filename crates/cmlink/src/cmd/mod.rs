use clap::{Args, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use cmlink_control::{Communicator, CommunicatorConfig};
use cmlink_session::{Session, SessionConfig};

use crate::exit::{control_error, io_error, session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod containers;
pub mod echo;
pub mod request;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Queue payloads on the control channel and flush them.
    Send(SendArgs),
    /// Send one payload and print the correlated response.
    Request(RequestArgs),
    /// Bind the socket and echo every frame back (test peer).
    Echo(EchoArgs),
    /// List containers known to the daemon.
    Containers(ContainersArgs),
    /// Unlock and start a container.
    Start(StartArgs),
    /// Stop a container.
    Stop(UuidArgs),
    /// Switch the foreground to a container.
    Switch(UuidArgs),
    /// Show a container's state or configuration.
    Status(StatusArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub socket: PathBuf,
    pub response_timeout: Option<Duration>,
    pub format: OutputFormat,
}

impl Context {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            response_timeout: self.response_timeout,
            ..SessionConfig::default()
        }
    }

    pub fn connect(&self) -> CliResult<Session> {
        cmlink_session::connect_with_config(&self.socket, self.session_config())
            .map_err(|err| session_error("connect failed", err))
    }

    pub fn communicator(&self, hidden_names: Vec<String>) -> CliResult<Communicator> {
        let config = CommunicatorConfig {
            session: self.session_config(),
            hidden_names,
        };
        Communicator::connect(&self.socket, config)
            .map_err(|err| control_error("connect failed", err))
    }
}

pub fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, ctx),
        Command::Request(args) => request::run(args, ctx),
        Command::Echo(args) => echo::run(args, ctx),
        Command::Containers(args) => containers::list(args, ctx),
        Command::Start(args) => containers::start(args, ctx),
        Command::Stop(args) => containers::stop(args, ctx),
        Command::Switch(args) => containers::switch(args, ctx),
        Command::Status(args) => containers::status(args, ctx),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(json) = &self.json {
            serde_json::from_str::<serde_json::Value>(json)
                .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
            return Ok(json.as_bytes().to_vec());
        }
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Number of copies to queue.
    #[arg(long, default_value = "1")]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Exit after N frames have been received.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ContainersArgs {
    /// Include containers hidden by default (a0).
    #[arg(long)]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Container uuid.
    pub uuid: String,
    /// Container key (password or PIN).
    #[arg(long, env = "CMLINK_CONTAINER_KEY", hide_env_values = true)]
    pub key: String,
}

#[derive(Args, Debug)]
pub struct UuidArgs {
    /// Container uuid.
    pub uuid: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Container uuid.
    pub uuid: String,
    /// Print the container configuration instead of its state.
    #[arg(long)]
    pub config: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn json_payload_must_parse() {
        let args = PayloadArgs {
            json: Some("{not json".to_string()),
            data: None,
            file: None,
        };
        assert_eq!(args.resolve().unwrap_err().code, USAGE);
    }

    #[test]
    fn empty_payload_is_allowed() {
        let args = PayloadArgs {
            json: None,
            data: None,
            file: None,
        };
        assert!(args.resolve().unwrap().is_empty());
    }
}

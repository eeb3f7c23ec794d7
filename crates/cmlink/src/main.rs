mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
use cmlink_transport::DEFAULT_SOCKET_PATH;

use crate::cmd::{parse_duration, Command, Context};
use crate::exit::CliResult;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "cmlink", version, about = "Container management control-channel client")]
struct Cli {
    /// Control socket path.
    #[arg(
        long,
        value_name = "PATH",
        env = "CMLINK_SOCKET",
        default_value = DEFAULT_SOCKET_PATH,
        global = true
    )]
    socket: PathBuf,

    /// Give up waiting for a correlated response after this long (e.g. 5s, 500ms).
    /// Default: wait indefinitely.
    #[arg(long, value_name = "DURATION", global = true)]
    timeout: Option<String>,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn context(&self) -> CliResult<Context> {
        let response_timeout = self.timeout.as_deref().map(parse_duration).transpose()?;
        Ok(Context {
            socket: self.socket.clone(),
            response_timeout,
            format: self.format.unwrap_or_else(OutputFormat::default_for_stdout),
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let result = cli.context().and_then(|ctx| cmd::run(cli.command, &ctx));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

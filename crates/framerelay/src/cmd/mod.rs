use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay server.
    Serve(ServeArgs),
    /// Send one message to a relay.
    Send(SendArgs),
    /// Connect to a relay and print relayed messages.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:22102")]
    pub bind: SocketAddr,
    /// Maximum payload size in bytes.
    #[arg(long, default_value_t = framerelay_frame::DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
    /// Frames buffered per connection before broadcasts to it are dropped.
    #[arg(long, default_value_t = framerelay_server::DEFAULT_OUTBOUND_QUEUE_DEPTH)]
    pub queue_depth: usize,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Relay address to connect to.
    pub addr: SocketAddr,
    /// Message text.
    #[arg(long, short = 'm', conflicts_with = "file")]
    pub message: Option<String>,
    /// Read message text from a file.
    #[arg(long, conflicts_with = "message")]
    pub file: Option<PathBuf>,
    /// Connect/write timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Relay address to connect to.
    pub addr: SocketAddr,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Connect timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
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
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

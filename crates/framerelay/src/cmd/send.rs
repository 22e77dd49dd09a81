use std::fs;
use std::net::TcpStream;

use framerelay_frame::{encode_utf32, FrameConfig, FrameWriter};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub fn run(args: SendArgs, _format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let text = resolve_text(&args)?;

    let stream = TcpStream::connect_timeout(&args.addr, timeout)
        .map_err(|err| io_error("connect failed", err))?;

    let config = FrameConfig {
        write_timeout: Some(timeout),
        ..FrameConfig::default()
    };
    let mut writer = FrameWriter::with_config_tcp(stream, config)
        .map_err(|err| frame_error("connect failed", err))?;

    writer
        .send(&encode_utf32(&text))
        .map_err(|err| frame_error("send failed", err))?;

    tracing::debug!(addr = %args.addr, chars = text.chars().count(), "message sent");
    Ok(SUCCESS)
}

fn resolve_text(args: &SendArgs) -> CliResult<String> {
    if let Some(message) = &args.message {
        return Ok(message.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "provide --message or --file"))
}

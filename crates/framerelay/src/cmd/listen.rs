use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use framerelay_frame::{decode_utf32, FrameConfig, FrameError, FrameReader};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

/// Read timeout used as the poll probe, so Ctrl-C is noticed between frames.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;

    let stream = TcpStream::connect_timeout(&args.addr, timeout)
        .map_err(|err| io_error("connect failed", err))?;

    let config = FrameConfig {
        read_timeout: Some(POLL_INTERVAL),
        ..FrameConfig::default()
    };
    let mut reader = FrameReader::with_config_tcp(stream, config)
        .map_err(|err| frame_error("connect failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let payload = match reader.read_frame() {
            Ok(payload) => payload,
            // A timed-out read is not an error, just this cycle's poll tick.
            Err(FrameError::Io(err))
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(FrameError::ConnectionClosed) => {
                tracing::info!("relay closed the connection");
                break;
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        };

        let text = match decode_utf32(&payload) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "skipping undecodable message");
                continue;
            }
        };

        print_message(&text, payload.len(), format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

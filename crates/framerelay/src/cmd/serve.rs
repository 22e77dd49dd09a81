use framerelay_server::{RelayConfig, RelayServer};

use crate::cmd::ServeArgs;
use crate::exit::{server_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub fn run(args: ServeArgs, _format: OutputFormat) -> CliResult<i32> {
    if args.max_payload > u16::MAX as usize {
        return Err(CliError::new(
            USAGE,
            format!("--max-payload must be at most {}", u16::MAX),
        ));
    }
    if args.queue_depth == 0 {
        return Err(CliError::new(USAGE, "--queue-depth must be at least 1"));
    }

    let config = RelayConfig {
        bind_addr: args.bind,
        max_payload_size: args.max_payload,
        outbound_queue_depth: args.queue_depth,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))?;

    runtime.block_on(async move {
        let server = RelayServer::bind(config)
            .await
            .map_err(|err| server_error("bind failed", err))?;

        tokio::select! {
            result = server.run() => {
                result.map_err(|err| server_error("serve failed", err))?;
                Ok(SUCCESS)
            }
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|err| {
                    CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
                })?;
                tracing::info!("interrupted, shutting down");
                Ok(SUCCESS)
            }
        }
    })
}

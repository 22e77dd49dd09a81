use std::fmt;
use std::io;

use framerelay_frame::FrameError;
use framerelay_server::ServerError;

// Exit code constants; sysexits-adjacent.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => TRANSPORT_ERROR,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. } | FrameError::InvalidUtf32 { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        FrameError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn server_error(context: &str, err: ServerError) -> CliError {
    match err {
        ServerError::Bind { source, .. } | ServerError::Accept(source) | ServerError::Io(source) => {
            io_error(context, source)
        }
        ServerError::Frame(err) => frame_error(context, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_codes() {
        let err = io_error("ctx", io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(err.code, TIMEOUT);

        let err = io_error("ctx", io::Error::from(io::ErrorKind::ConnectionRefused));
        assert_eq!(err.code, FAILURE);

        let err = io_error("ctx", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn frame_error_codes() {
        let err = frame_error("ctx", FrameError::PayloadTooLarge { size: 9, max: 4 });
        assert_eq!(err.code, DATA_INVALID);

        let err = frame_error("ctx", FrameError::InvalidUtf32 { offset: 0 });
        assert_eq!(err.code, DATA_INVALID);

        let err = frame_error("ctx", FrameError::ConnectionClosed);
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn server_error_unwraps_io_source() {
        let err = server_error(
            "ctx",
            ServerError::Accept(io::Error::from(io::ErrorKind::PermissionDenied)),
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.starts_with("ctx: "));
    }
}

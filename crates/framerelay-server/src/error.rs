use std::io::ErrorKind;
use std::net::SocketAddr;

use framerelay_frame::FrameError;

/// Errors that can occur in relay server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the listen address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// An I/O error occurred on a connection stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Whether an I/O error means the remote endpoint is gone.
///
/// Reset-like conditions are absorbed at the connection boundary (the peer is
/// removed from the table); anything else is a fatal transport error and
/// propagates to the serve loop.
pub fn is_disconnect(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}

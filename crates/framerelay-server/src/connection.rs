use std::net::SocketAddr;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, warn};

use framerelay_frame::{FrameCodec, FrameError};

use crate::error::{is_disconnect, Result};

/// One fully assembled inbound frame, tagged with its sender.
///
/// Produced by a connection's reader task, consumed by the relay loop, and
/// not retained after processing.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender: SocketAddr,
    pub payload: Bytes,
}

/// Drive the receive half of one connection.
///
/// Every completed frame is forwarded to the packet queue in arrival order
/// (FIFO per connection). Returns `Ok(())` when the peer is gone — clean EOF,
/// a reset-like I/O error, or a protocol violation that forfeits the
/// connection — and `Err` only for fatal transport errors.
pub(crate) async fn read_loop<R>(
    addr: SocketAddr,
    read_half: R,
    max_payload: usize,
    packets: mpsc::UnboundedSender<InboundMessage>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(read_half, FrameCodec::new(max_payload));

    while let Some(next) = frames.next().await {
        match next {
            Ok(payload) => {
                let message = InboundMessage {
                    sender: addr,
                    payload,
                };
                if packets.send(message).is_err() {
                    // Relay loop is gone; the server is shutting down.
                    return Ok(());
                }
            }
            Err(FrameError::Io(err)) if is_disconnect(&err) => {
                debug!(%addr, error = %err, "peer reset");
                return Ok(());
            }
            Err(FrameError::PayloadTooLarge { size, max }) => {
                warn!(%addr, size, max, "peer advertised oversized frame, dropping connection");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    }

    debug!(%addr, "peer closed connection");
    Ok(())
}

/// Drive the send half of one connection.
///
/// The sole consumer of the connection's outbound queue: frames are written
/// one at a time, so exactly one frame is in flight per connection and no
/// other execution context ever touches the write half. Ends when the queue
/// is closed (connection torn down) or the peer is gone.
pub(crate) async fn write_loop<W>(
    addr: SocketAddr,
    write_half: W,
    max_payload: usize,
    mut outbound: mpsc::Receiver<Bytes>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(write_half, FrameCodec::new(max_payload));

    while let Some(payload) = outbound.recv().await {
        match sink.send(payload).await {
            Ok(()) => {}
            Err(FrameError::Io(err)) if is_disconnect(&err) => {
                debug!(%addr, error = %err, "peer reset during send");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

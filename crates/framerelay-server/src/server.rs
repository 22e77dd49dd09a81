use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use framerelay_frame::{decode_utf32, encode_utf32};

use crate::config::RelayConfig;
use crate::connection::{read_loop, write_loop, InboundMessage};
use crate::error::{is_disconnect, Result, ServerError};
use crate::table::{ConnectionHandle, ConnectionTable};

/// Messages drained from the packet queue per relay cycle.
const RELAY_BATCH_SIZE: usize = 64;

/// The TCP multi-client relay.
///
/// Accepts unboundedly many peers and rebroadcasts every received message,
/// decorated with its sender's address, to all other connected peers.
pub struct RelayServer {
    listener: TcpListener,
    table: Arc<ConnectionTable>,
    config: RelayConfig,
}

impl RelayServer {
    /// Bind the listen socket.
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr,
                source,
            })?;
        info!(addr = %config.bind_addr, "relay listening");

        Ok(Self {
            listener,
            table: Arc::new(ConnectionTable::new()),
            config,
        })
    }

    /// The actual bound address (resolves port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared view of the connection table.
    pub fn table(&self) -> Arc<ConnectionTable> {
        Arc::clone(&self.table)
    }

    /// Serve until a fatal transport error.
    ///
    /// Drives the accept loop and the relay loop concurrently. Peer resets
    /// and clean disconnects are absorbed per connection; any other transport
    /// error reaching a connection task or the accept loop ends the serve
    /// loop with that error.
    pub async fn run(self) -> Result<()> {
        let Self {
            listener,
            table,
            config,
        } = self;

        let (packet_tx, packet_rx) = mpsc::unbounded_channel();
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();

        tokio::select! {
            result = accept_loop(&listener, &table, &config, packet_tx, fatal_tx) => result,
            result = relay_loop(packet_rx, &table, &config) => result,
            fatal = fatal_rx.recv() => match fatal {
                Some(err) => Err(err),
                None => Ok(()),
            },
        }
    }
}

/// Accept peers forever, registering each in the connection table.
async fn accept_loop(
    listener: &TcpListener,
    table: &Arc<ConnectionTable>,
    config: &RelayConfig,
    packets: mpsc::UnboundedSender<InboundMessage>,
    fatal: mpsc::UnboundedSender<ServerError>,
) -> Result<()> {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            // The peer can go away between readiness and accept completing.
            Err(err) if is_disconnect(&err) => continue,
            Err(err) => return Err(ServerError::Accept(err)),
        };

        if let Err(err) = stream.set_nodelay(true) {
            debug!(%addr, error = %err, "failed to set TCP_NODELAY");
        }

        info!(%addr, "client connected");
        spawn_connection(
            stream,
            addr,
            Arc::clone(table),
            config,
            packets.clone(),
            fatal.clone(),
        );
    }
}

/// Split one accepted stream into its reader and writer tasks.
///
/// The writer task is the only consumer of the connection's outbound queue,
/// so send state is single-owner by construction. The reader task owns table
/// removal: when it ends, the entry is dropped and the closed queue winds
/// down the writer.
fn spawn_connection(
    stream: TcpStream,
    addr: SocketAddr,
    table: Arc<ConnectionTable>,
    config: &RelayConfig,
    packets: mpsc::UnboundedSender<InboundMessage>,
    fatal: mpsc::UnboundedSender<ServerError>,
) {
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_depth);
    table.insert(ConnectionHandle::new(addr, outbound_tx));

    let max_payload = config.max_payload_size;

    let writer_fatal = fatal.clone();
    tokio::spawn(async move {
        if let Err(err) = write_loop(addr, write_half, max_payload, outbound_rx).await {
            let _ = writer_fatal.send(err);
        }
    });

    tokio::spawn(async move {
        let result = read_loop(addr, read_half, max_payload, packets).await;
        if table.remove(addr).is_some() {
            info!(%addr, "client disconnected");
        }
        if let Err(err) = result {
            let _ = fatal.send(err);
        }
    });
}

/// Drain the packet queue and rebroadcast each message.
async fn relay_loop(
    mut packets: mpsc::UnboundedReceiver<InboundMessage>,
    table: &Arc<ConnectionTable>,
    config: &RelayConfig,
) -> Result<()> {
    let mut batch = Vec::with_capacity(RELAY_BATCH_SIZE);
    loop {
        if packets.recv_many(&mut batch, RELAY_BATCH_SIZE).await == 0 {
            // All producers gone; nothing left to relay.
            return Ok(());
        }
        for message in batch.drain(..) {
            relay_one(message, table, config);
        }
    }
}

/// Decode, log, and rebroadcast one inbound message.
///
/// Exclusion is by socket address equality with the originating sender. A
/// failure for one recipient never aborts delivery to the rest.
fn relay_one(message: InboundMessage, table: &ConnectionTable, config: &RelayConfig) {
    let text = match decode_utf32(&message.payload) {
        Ok(text) => text,
        Err(err) => {
            warn!(sender = %message.sender, error = %err, "dropping undecodable message");
            return;
        }
    };

    let line = format!("{}: {}", message.sender, text);
    info!("{line}");

    let encoded = Bytes::from(encode_utf32(&line));
    if encoded.len() > config.max_payload_size {
        warn!(
            sender = %message.sender,
            size = encoded.len(),
            "decorated message exceeds frame capacity, not relayed"
        );
        return;
    }

    let sender = message.sender;
    let outcome = table.broadcast(|peer| peer != sender, &encoded);
    for addr in outcome.disconnected {
        if table.remove(addr).is_some() {
            info!(%addr, "client disconnected");
        }
    }
    debug!(
        sender = %sender,
        delivered = outcome.delivered,
        dropped = outcome.dropped,
        "relayed message"
    );
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    fn message(sender: SocketAddr, text: &str) -> InboundMessage {
        InboundMessage {
            sender,
            payload: Bytes::from(encode_utf32(text)),
        }
    }

    #[test]
    fn relay_one_excludes_the_sender() {
        let table = ConnectionTable::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        table.insert(ConnectionHandle::new(addr(1), tx_a));
        table.insert(ConnectionHandle::new(addr(2), tx_b));

        relay_one(message(addr(1), "hi"), &table, &RelayConfig::default());

        assert!(rx_a.try_recv().is_err());
        let delivered = rx_b.try_recv().unwrap();
        assert_eq!(
            decode_utf32(&delivered).unwrap(),
            format!("{}: hi", addr(1))
        );
    }

    #[test]
    fn relay_one_removes_disconnected_recipient() {
        let table = ConnectionTable::new();
        let (tx_gone, rx_gone) = mpsc::channel(4);
        table.insert(ConnectionHandle::new(addr(2), tx_gone));
        drop(rx_gone);

        relay_one(message(addr(1), "hi"), &table, &RelayConfig::default());

        assert!(!table.contains(addr(2)));
    }

    #[test]
    fn relay_one_skips_undecodable_payload() {
        let table = ConnectionTable::new();
        let (tx, mut rx) = mpsc::channel(4);
        table.insert(ConnectionHandle::new(addr(2), tx));

        let bad = InboundMessage {
            sender: addr(1),
            payload: Bytes::from_static(&[1, 2, 3]), // unaligned
        };
        relay_one(bad, &table, &RelayConfig::default());

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn relay_one_skips_oversized_decorated_line() {
        let table = ConnectionTable::new();
        let (tx, mut rx) = mpsc::channel(4);
        table.insert(ConnectionHandle::new(addr(2), tx));

        // Payload fits, but sender decoration pushes the line past capacity.
        let config = RelayConfig::default();
        let text = "x".repeat(config.max_payload_size / 4);
        relay_one(message(addr(1), &text), &table, &config);

        assert!(rx.try_recv().is_err());
    }
}

//! End-to-end relay tests over loopback TCP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::codec::Framed;

use framerelay_frame::{decode_utf32, encode_utf32, FrameCodec, DEFAULT_MAX_PAYLOAD};
use framerelay_server::{ConnectionTable, RelayConfig, RelayServer, Result};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server(
    mut config: RelayConfig,
) -> (SocketAddr, Arc<ConnectionTable>, JoinHandle<Result<()>>) {
    config.bind_addr = "127.0.0.1:0".parse().unwrap();
    let server = RelayServer::bind(config).await.expect("bind should succeed");
    let addr = server.local_addr().expect("local addr should resolve");
    let table = server.table();
    let handle = tokio::spawn(server.run());
    (addr, table, handle)
}

struct Client {
    framed: Framed<TcpStream, FrameCodec>,
    addr: SocketAddr,
}

impl Client {
    async fn connect(server: SocketAddr) -> Self {
        let stream = TcpStream::connect(server)
            .await
            .expect("client should connect");
        let addr = stream.local_addr().expect("local addr should resolve");
        Self {
            framed: Framed::new(stream, FrameCodec::new(DEFAULT_MAX_PAYLOAD)),
            addr,
        }
    }

    async fn send_text(&mut self, text: &str) {
        self.framed
            .send(Bytes::from(encode_utf32(text)))
            .await
            .expect("send should succeed");
    }

    async fn recv_text(&mut self) -> String {
        let frame = timeout(RECV_TIMEOUT, self.framed.next())
            .await
            .expect("receive should not time out")
            .expect("stream should not end")
            .expect("frame should decode");
        decode_utf32(&frame).expect("payload should be UTF-32 text")
    }

    async fn expect_silence(&mut self, for_duration: Duration) {
        let result = timeout(for_duration, self.framed.next()).await;
        assert!(result.is_err(), "expected no message, got {result:?}");
    }
}

async fn wait_for_connections(table: &ConnectionTable, n: usize) {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while table.len() != n {
        assert!(
            tokio::time::Instant::now() < deadline,
            "table never reached {n} connections (now {})",
            table.len()
        );
        sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn message_is_relayed_to_all_other_peers() {
    let (server, table, _handle) = start_server(RelayConfig::default()).await;

    let mut peer1 = Client::connect(server).await;
    let mut peer2 = Client::connect(server).await;
    let mut peer3 = Client::connect(server).await;
    wait_for_connections(&table, 3).await;

    peer1.send_text("hi").await;

    let expected = format!("{}: hi", peer1.addr);
    assert_eq!(peer2.recv_text().await, expected);
    assert_eq!(peer3.recv_text().await, expected);

    // The sender must not get its own message back.
    peer1.expect_silence(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn per_connection_order_is_preserved() {
    let (server, table, _handle) = start_server(RelayConfig::default()).await;

    let mut sender = Client::connect(server).await;
    let mut receiver = Client::connect(server).await;
    wait_for_connections(&table, 2).await;

    for i in 0..10 {
        sender.send_text(&format!("msg-{i}")).await;
    }
    for i in 0..10 {
        assert_eq!(
            receiver.recv_text().await,
            format!("{}: msg-{i}", sender.addr)
        );
    }
}

#[tokio::test]
async fn disconnected_peer_is_removed_and_skipped() {
    let (server, table, _handle) = start_server(RelayConfig::default()).await;

    let mut sender = Client::connect(server).await;
    let leaver = Client::connect(server).await;
    let mut stayer = Client::connect(server).await;
    wait_for_connections(&table, 3).await;

    let leaver_addr = leaver.addr;
    drop(leaver);
    wait_for_connections(&table, 2).await;
    assert!(!table.contains(leaver_addr));

    // Broadcasts continue to the remaining peer.
    sender.send_text("still here").await;
    assert_eq!(
        stayer.recv_text().await,
        format!("{}: still here", sender.addr)
    );
}

#[tokio::test]
async fn stalled_peer_does_not_block_others() {
    let config = RelayConfig {
        outbound_queue_depth: 2,
        ..RelayConfig::default()
    };
    let (server, table, _handle) = start_server(config).await;

    let mut sender = Client::connect(server).await;
    // Connects but never reads: its socket and outbound queue fill up.
    let _stalled = Client::connect(server).await;
    let mut healthy = Client::connect(server).await;
    wait_for_connections(&table, 3).await;

    let filler = "x".repeat(1500);
    for i in 0..40 {
        sender.send_text(&format!("{i} {filler}")).await;
        assert_eq!(
            healthy.recv_text().await,
            format!("{}: {i} {filler}", sender.addr)
        );
    }
}

#[tokio::test]
async fn oversized_frame_disconnects_only_the_offender() {
    let (server, table, handle) = start_server(RelayConfig::default()).await;

    let mut sender = Client::connect(server).await;
    let mut receiver = Client::connect(server).await;
    wait_for_connections(&table, 2).await;

    let mut offender = TcpStream::connect(server)
        .await
        .expect("offender should connect");
    wait_for_connections(&table, 3).await;
    offender
        .write_all(&u16::MAX.to_le_bytes())
        .await
        .expect("raw header should be written");

    // Protocol violation drops the offender, not the server.
    wait_for_connections(&table, 2).await;
    assert!(!handle.is_finished());

    sender.send_text("unaffected").await;
    assert_eq!(
        receiver.recv_text().await,
        format!("{}: unaffected", sender.addr)
    );
}

#[tokio::test]
async fn non_ascii_text_survives_the_relay() {
    let (server, table, _handle) = start_server(RelayConfig::default()).await;

    let mut sender = Client::connect(server).await;
    let mut receiver = Client::connect(server).await;
    wait_for_connections(&table, 2).await;

    sender.send_text("привет 🦀").await;
    assert_eq!(
        receiver.recv_text().await,
        format!("{}: привет 🦀", sender.addr)
    );
}

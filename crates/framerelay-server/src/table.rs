use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::warn;

/// Handle to one live connection: its peer address and the entry point of
/// its outbound frame queue.
///
/// The queue is consumed solely by the connection's writer task, so enqueueing
/// here and advancing an in-flight write can never race on shared send state.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    addr: SocketAddr,
    outbound: mpsc::Sender<Bytes>,
}

/// Result of enqueueing one frame for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The frame was queued for delivery.
    Queued,
    /// The outbound queue is full; the frame was dropped for this peer.
    Dropped,
    /// The writer task is gone; the peer should be removed from the table.
    Disconnected,
}

impl ConnectionHandle {
    pub fn new(addr: SocketAddr, outbound: mpsc::Sender<Bytes>) -> Self {
        Self { addr, outbound }
    }

    /// Peer address; the table key and broadcast identity.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Enqueue one frame without blocking.
    ///
    /// A full queue means this peer is not draining its socket; the frame is
    /// dropped rather than stalling the caller (delivery to slow peers is not
    /// guaranteed).
    pub fn try_queue(&self, payload: Bytes) -> SendOutcome {
        match self.outbound.try_send(payload) {
            Ok(()) => SendOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Disconnected,
        }
    }
}

/// Per-broadcast delivery tally.
#[derive(Debug, Default)]
pub struct BroadcastOutcome {
    /// Peers the frame was queued for.
    pub delivered: usize,
    /// Peers whose outbound queue was full.
    pub dropped: usize,
    /// Peers found disconnected; the caller removes them from the table.
    pub disconnected: Vec<SocketAddr>,
}

/// The live registry of currently connected peers.
///
/// Entries are added on accept and removed on detected disconnect. Iteration
/// works on a snapshot of the handles, so the relay loop can broadcast while
/// accept and reader tasks mutate the table.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    inner: Mutex<HashMap<SocketAddr, ConnectionHandle>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    // Lock discipline: every critical section is a single map operation or a
    // snapshot copy; nothing awaits or does I/O while holding the lock.
    fn locked(&self) -> std::sync::MutexGuard<'_, HashMap<SocketAddr, ConnectionHandle>> {
        self.inner.lock().expect("connection table lock poisoned")
    }

    /// Register a freshly accepted connection.
    pub fn insert(&self, handle: ConnectionHandle) {
        let addr = handle.addr();
        if self.locked().insert(addr, handle).is_some() {
            warn!(%addr, "replaced stale connection table entry");
        }
    }

    /// Remove a connection; returns the handle if it was present.
    pub fn remove(&self, addr: SocketAddr) -> Option<ConnectionHandle> {
        self.locked().remove(&addr)
    }

    /// Whether a peer is currently registered.
    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.locked().contains_key(&addr)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all handles.
    pub fn handles(&self) -> Vec<ConnectionHandle> {
        self.locked().values().cloned().collect()
    }

    /// Queue `payload` for every connection passing `filter`.
    ///
    /// Never blocks; a failure for one recipient does not abort delivery to
    /// the rest. Disconnected peers are reported, not removed — removal is
    /// the caller's step so the disconnect can be logged once.
    pub fn broadcast<F>(&self, filter: F, payload: &Bytes) -> BroadcastOutcome
    where
        F: Fn(SocketAddr) -> bool,
    {
        let mut outcome = BroadcastOutcome::default();
        for handle in self.handles() {
            if !filter(handle.addr()) {
                continue;
            }
            match handle.try_queue(payload.clone()) {
                SendOutcome::Queued => outcome.delivered += 1,
                SendOutcome::Dropped => {
                    warn!(addr = %handle.addr(), "outbound queue full, dropping frame");
                    outcome.dropped += 1;
                }
                SendOutcome::Disconnected => outcome.disconnected.push(handle.addr()),
            }
        }
        outcome
    }
}

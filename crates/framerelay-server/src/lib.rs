//! TCP multi-client relay server.
//!
//! Accepts concurrent stream connections, assembles length-prefixed frames
//! per peer, and rebroadcasts each received message to every other connected
//! peer. I/O is readiness-driven: one reader and one writer task per
//! connection, a shared connection table, and a single relay loop draining
//! the inbound packet queue.

pub mod config;
pub mod connection;
pub mod error;
pub mod server;
pub mod table;

pub use config::{RelayConfig, DEFAULT_OUTBOUND_QUEUE_DEPTH, DEFAULT_PORT};
pub use connection::InboundMessage;
pub use error::{is_disconnect, Result, ServerError};
pub use server::RelayServer;
pub use table::{BroadcastOutcome, ConnectionHandle, ConnectionTable, SendOutcome};

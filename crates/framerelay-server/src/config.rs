use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use framerelay_frame::DEFAULT_MAX_PAYLOAD;

/// Default relay listen port.
pub const DEFAULT_PORT: u16 = 22102;

/// Default depth of a connection's outbound frame queue.
pub const DEFAULT_OUTBOUND_QUEUE_DEPTH: usize = 32;

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// Maximum payload size accepted or sent on any connection.
    pub max_payload_size: usize,
    /// Frames buffered per connection before broadcasts to it are dropped.
    pub outbound_queue_depth: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            outbound_queue_depth: DEFAULT_OUTBOUND_QUEUE_DEPTH,
        }
    }
}

//! Transport layer abstraction.
//!
//! Provides the [`Transport`] trait (single-target client, used by the
//! recorder) and [`AgentTransport`] (listener-side, used by the fleet
//! scheduler). There is no TCP/TLS transport and no multi-target
//! multiplexed handle: simulated devices and the recorder both only ever
//! speak SNMP-over-UDP to one peer per socket.

mod udp;

pub use udp::{AgentUdpTransport, UdpTransport};
pub(crate) use udp::MAX_DATAGRAM_SIZE;

use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// Client-side transport abstraction: one owned socket talking to one peer.
pub trait Transport: Send + Sync {
    /// Send request data to the target.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Receive a response, waiting up to `timeout`.
    ///
    /// Returns `(response_data, actual_source_address)`; the caller checks
    /// the source address itself since a connected UDP socket only accepts
    /// datagrams from its peer anyway.
    fn recv(&self, timeout: Duration) -> impl Future<Output = Result<(Bytes, SocketAddr)>> + Send;

    /// The peer address for this transport.
    fn peer_addr(&self) -> SocketAddr;

    /// Local bind address.
    fn local_addr(&self) -> SocketAddr;
}

/// Agent-side transport abstraction (listener mode): the fleet scheduler's
/// per-agent socket. This is the "future agent functionality" the teacher's
/// version of this trait anticipated.
pub trait AgentTransport: Send + Sync {
    /// Receive data from any source.
    fn recv_from(&self, buf: &mut [u8])
    -> impl Future<Output = Result<(usize, SocketAddr)>> + Send;

    /// Send data to a specific target.
    fn send_to(&self, data: &[u8], target: SocketAddr) -> impl Future<Output = Result<()>> + Send;

    /// Local bind address.
    fn local_addr(&self) -> SocketAddr;
}

//! Single-target UDP transport: one connected socket per recorder run, and
//! one bound-but-unconnected socket per fleet agent listener.
//!
//! Grounded on the teacher's `util::bind_udp_socket`/`bind_ephemeral_udp_socket`
//! (socket2-based IPv6/reuse-address setup) and on the error-handling shape
//! of `trap::sender::send` (timeout wraps the raw `io::Error` into
//! `Error::Timeout`/`Error::Io`), simplified from the teacher's
//! `SharedUdpTransport` request-ID-multiplexed design: the recorder talks to
//! one target at a time and does not need concurrent-target correlation.

use crate::error::{Error, Result};
use crate::util::{bind_ephemeral_udp_socket, bind_udp_socket};
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

use super::{AgentTransport, Transport};

/// Maximum datagram size read from the wire (RFC 1157/3412 v3 messages are
/// smaller than this in practice; this bound exists to size the read
/// buffer, not to enforce a protocol limit).
pub(crate) const MAX_DATAGRAM_SIZE: usize = 65_507;

/// A UDP socket connected to exactly one peer, used by the recorder client.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral local socket and connect it to `peer`.
    pub async fn connect(peer: SocketAddr) -> Result<Self> {
        let socket = bind_ephemeral_udp_socket(peer)
            .await
            .map_err(|e| Error::Io { target: Some(peer), source: e })?;
        socket.connect(peer).await.map_err(|e| Error::Io { target: Some(peer), source: e })?;
        Ok(Self { socket, peer })
    }
}

impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        self.socket.send(data).await.map_err(|e| Error::Io { target: Some(self.peer), source: e })?;
        Ok(())
    }

    async fn recv(&self, timeout: Duration) -> Result<(Bytes, SocketAddr)> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let n = tokio::time::timeout(timeout, self.socket.recv(&mut buf))
            .await
            .map_err(|_| Error::Timeout { target: Some(self.peer), elapsed: timeout, request_id: 0, retries: 0 })?
            .map_err(|e| Error::Io { target: Some(self.peer), source: e })?;
        buf.truncate(n);
        Ok((Bytes::from(buf), self.peer))
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap_or(self.peer)
    }
}

/// A UDP socket bound to a fixed local address, serving any number of
/// peers; used one-per-agent by the fleet listener.
pub struct AgentUdpTransport {
    socket: UdpSocket,
    local: SocketAddr,
}

impl AgentUdpTransport {
    /// Bind a socket at `addr` with the fleet's standard socket options
    /// (`SO_RCVBUF`/`SO_SNDBUF` 256 KiB, best-effort `SO_REUSEPORT`).
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = bind_udp_socket(addr).await.map_err(|e| Error::Io { target: Some(addr), source: e })?;
        apply_fleet_socket_options(&socket);
        let local = socket.local_addr().unwrap_or(addr);
        Ok(Self { socket, local })
    }

    /// Read one datagram, giving up after `deadline` so the caller can poll
    /// for shutdown (spec: 1s read deadline).
    pub async fn recv_with_deadline(&self, buf: &mut [u8], deadline: Duration) -> Result<Option<(usize, SocketAddr)>> {
        match tokio::time::timeout(deadline, self.socket.recv_from(buf)).await {
            Ok(Ok((n, peer))) => Ok(Some((n, peer))),
            Ok(Err(e)) => Err(Error::Io { target: None, source: e }),
            Err(_) => Ok(None),
        }
    }

    /// Peek the length of the next queued datagram without consuming it, so
    /// the caller can size a buffer before the real read (pooled for
    /// ordinary-size datagrams, a one-off allocation for oversize ones).
    /// `scratch` is reused across calls by the caller and never pooled
    /// itself.
    pub async fn peek_len_with_deadline(&self, scratch: &mut [u8], deadline: Duration) -> Result<Option<usize>> {
        match tokio::time::timeout(deadline, self.socket.peek_from(scratch)).await {
            Ok(Ok((n, _peer))) => Ok(Some(n)),
            Ok(Err(e)) => Err(Error::Io { target: None, source: e }),
            Err(_) => Ok(None),
        }
    }
}

impl AgentTransport for AgentUdpTransport {
    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await.map_err(|e| Error::Io { target: None, source: e })
    }

    async fn send_to(&self, data: &[u8], target: SocketAddr) -> Result<()> {
        self.socket.send_to(data, target).await.map_err(|e| Error::Io { target: Some(target), source: e })?;
        Ok(())
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }
}

/// Best-effort `SO_RCVBUF`/`SO_SNDBUF`/`SO_REUSEPORT`; failures are logged,
/// not fatal (spec: "best-effort SO_REUSEPORT").
fn apply_fleet_socket_options(socket: &UdpSocket) {
    let sock_ref = socket2::SockRef::from(socket);
    const FLEET_BUF_SIZE: usize = 256 * 1024;
    if let Err(e) = sock_ref.set_recv_buffer_size(FLEET_BUF_SIZE) {
        tracing::debug!(error = %e, "failed to set SO_RCVBUF");
    }
    if let Err(e) = sock_ref.set_send_buffer_size(FLEET_BUF_SIZE) {
        tracing::debug!(error = %e, "failed to set SO_SNDBUF");
    }
    #[cfg(all(unix, not(target_os = "windows")))]
    if let Err(e) = sock_ref.set_reuse_port(true) {
        tracing::debug!(error = %e, "failed to set SO_REUSEPORT");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn udp_transport_round_trip() {
        let listener = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = UdpTransport::connect(addr).await.unwrap();

        transport.send(b"hello").await.unwrap();
        let mut buf = [0u8; 16];
        let (n, peer) = listener.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello");
        listener.send_to(b"world", peer).await.unwrap();

        let (data, from) = transport.recv(Duration::from_secs(1)).await.unwrap();
        assert_eq!(data.as_ref(), b"world");
        assert_eq!(from, addr);
    }

    #[tokio::test]
    async fn udp_transport_recv_times_out() {
        let listener = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let transport = UdpTransport::connect(addr).await.unwrap();
        let result = transport.recv(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));
    }

    #[tokio::test]
    async fn agent_udp_transport_binds_and_echoes() {
        let agent = AgentUdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = agent.local_addr();

        let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"ping", addr).await.unwrap();

        let mut buf = [0u8; 16];
        let (n, peer) = agent.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");
        agent.send_to(b"pong", peer).await.unwrap();

        let mut reply = [0u8; 16];
        let (n, _) = client.recv_from(&mut reply).await.unwrap();
        assert_eq!(&reply[..n], b"pong");
    }

    #[tokio::test]
    async fn recv_with_deadline_times_out_without_error() {
        let agent = AgentUdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let mut buf = [0u8; 16];
        let result = agent.recv_with_deadline(&mut buf, Duration::from_millis(50)).await.unwrap();
        assert!(result.is_none());
    }
}

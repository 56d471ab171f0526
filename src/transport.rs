//! Datagram transport used by the resolver.
//!
//! The resolver only needs one round trip per hop: send the request bytes,
//! wait a bounded time for one reply, hand the reply back. [`Transport`]
//! captures exactly that so tests can stand in scripted nameservers.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::TransportError;

/// Largest UDP message accepted without EDNS (RFC 1035 section 4.2.1).
pub const MAX_UDP_MESSAGE_SIZE: usize = 512;

/// One request/response exchange with a nameserver.
pub trait Transport {
    /// Sends `request` to `server` and returns the reply bytes.
    ///
    /// Must give up with [`TransportError::Timeout`] once `timeout` passes
    /// without a reply.
    fn send_and_receive(
        &self,
        server: SocketAddr,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send_and_receive(
        &self,
        server: SocketAddr,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).send_and_receive(server, request, timeout)
    }
}

/// Plain UDP transport on a fresh ephemeral socket per exchange.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpTransport;

impl UdpTransport {
    pub fn new() -> Self {
        UdpTransport
    }
}

impl Transport for UdpTransport {
    fn send_and_receive(
        &self,
        server: SocketAddr,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let network = |source: io::Error| TransportError::Network { server, source };

        // Let the OS pick the interface and an ephemeral port.
        let bind_ip = if server.is_ipv4() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        };
        let socket = UdpSocket::bind(SocketAddr::new(bind_ip, 0)).map_err(network)?;

        let bytes_sent = socket.send_to(request, server).map_err(network)?;
        debug!(server = %server, bytes_sent, "UDP query sent");

        // Stray datagrams must not extend the wait past the deadline.
        let deadline = Instant::now() + timeout;
        let mut response_buffer = [0u8; MAX_UDP_MESSAGE_SIZE];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout { server, timeout });
            }
            socket.set_read_timeout(Some(remaining)).map_err(network)?;

            let (size, from) = socket.recv_from(&mut response_buffer).map_err(|e| {
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut {
                    TransportError::Timeout { server, timeout }
                } else {
                    TransportError::Network { server, source: e }
                }
            })?;

            if from.ip() != server.ip() {
                warn!(expected = %server, received_from = %from, "UDP response from unexpected source");
                continue;
            }

            debug!(server = %server, bytes_received = size, "UDP response received");
            return Ok(response_buffer[..size].to_vec());
        }
    }
}

//! Datagram transmission.
//!
//! [`SocketPool`] owns one non-blocking UDP socket per address family in
//! use, so a single emitter can fan out to IPv4 and IPv6 destinations.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::debug;

use crate::error::{EmitError, EmitResult};

/// Anything that can push one datagram towards an address.
pub trait DatagramSink {
    fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> io::Result<usize>;
}

impl DatagramSink for UdpSocket {
    #[inline]
    fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, payload, dest)
    }
}

impl<K: DatagramSink + ?Sized> DatagramSink for &mut K {
    #[inline]
    fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> io::Result<usize> {
        (**self).send_to(payload, dest)
    }
}

/// Socket tuning applied when the pool is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SocketOptions {
    /// TTL (IPv4) / hop limit (IPv6) for multicast destinations.
    pub multicast_ttl: u32,
    /// `SO_SNDBUF` override.
    pub send_buffer_size: Option<usize>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            multicast_ttl: 4,
            send_buffer_size: None,
        }
    }
}

/// Per-family UDP sockets, exclusively owned by one emitter run.
pub struct SocketPool {
    v4: Option<Socket>,
    v6: Option<Socket>,
}

impl SocketPool {
    /// Open the sockets needed to reach `dests`.
    pub fn open(dests: &[SocketAddr], options: &SocketOptions) -> EmitResult<Self> {
        let wants = |v6: bool| dests.iter().any(|d| d.is_ipv6() == v6);
        let multicast = |v6: bool| {
            dests
                .iter()
                .any(|d| d.is_ipv6() == v6 && d.ip().is_multicast())
        };

        let v4 = if wants(false) {
            Some(open_socket(Domain::IPV4, options, multicast(false))?)
        } else {
            None
        };
        let v6 = if wants(true) {
            Some(open_socket(Domain::IPV6, options, multicast(true))?)
        } else {
            None
        };

        Ok(Self { v4, v6 })
    }

    /// Local addresses of the open sockets.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        [&self.v4, &self.v6]
            .into_iter()
            .flatten()
            .filter_map(|s| s.local_addr().ok()?.as_socket())
            .collect()
    }
}

fn open_socket(domain: Domain, options: &SocketOptions, multicast: bool) -> EmitResult<Socket> {
    let create = || -> io::Result<Socket> {
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_nonblocking(true)?;

        if let Some(size) = options.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }

        let any: SocketAddr = if domain == Domain::IPV6 {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        };
        socket.bind(&any.into())?;

        if multicast {
            if domain == Domain::IPV6 {
                socket.set_multicast_hops_v6(options.multicast_ttl)?;
            } else {
                socket.set_multicast_ttl_v4(options.multicast_ttl)?;
            }
        }

        Ok(socket)
    };

    let socket = create().map_err(|source| EmitError::SocketCreationFailed { source })?;
    debug!(
        local = ?socket.local_addr().ok().and_then(|a| a.as_socket()),
        multicast,
        "opened udp socket"
    );
    Ok(socket)
}

impl DatagramSink for SocketPool {
    #[inline]
    fn send_to(&mut self, payload: &[u8], dest: SocketAddr) -> io::Result<usize> {
        let socket = match dest {
            SocketAddr::V4(_) => self.v4.as_ref(),
            SocketAddr::V6(_) => self.v6.as_ref(),
        }
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "no socket for address family")
        })?;

        socket.send_to(payload, &SockAddr::from(dest))
    }
}

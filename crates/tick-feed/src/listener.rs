//! Receiving side of the feed.
//!
//! Binds a UDP socket and decodes every datagram as one tick, the contract
//! any downstream packet filter honours.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tick_proto::{decode, CodecError, TickRecord, TICK_SIZE};

/// Larger than any valid tick so oversized datagrams are seen as malformed.
const RECV_BUFFER_SIZE: usize = 512;

pub struct TickListener {
    socket: UdpSocket,
    buffer: [u8; RECV_BUFFER_SIZE],
}

impl TickListener {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(Self {
            socket,
            buffer: [0; RECV_BUFFER_SIZE],
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// `None` blocks indefinitely.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    /// Receive one datagram and decode it.
    ///
    /// The outer error is socket-level (including timeouts); the inner one
    /// means a datagram arrived but was not a valid tick.
    pub fn recv(&mut self) -> io::Result<(Result<TickRecord, CodecError>, SocketAddr)> {
        let (len, from) = self.socket.recv_from(&mut self.buffer)?;
        Ok((decode(&self.buffer[..len]), from))
    }

    /// Receive up to `max` valid ticks, stopping early on the first
    /// socket error (typically a timeout). Malformed datagrams are skipped.
    pub fn collect(&mut self, max: usize) -> Vec<TickRecord> {
        let mut ticks = Vec::with_capacity(max.min(1 << 16));
        while ticks.len() < max {
            match self.recv() {
                Ok((Ok(tick), _)) => ticks.push(tick),
                Ok((Err(_), _)) => continue,
                Err(_) => break,
            }
        }
        ticks
    }
}

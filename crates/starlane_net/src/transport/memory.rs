//! In-process datagram network for tests and local demos.
//!
//! Every bound address owns an inbox. Sends to an unbound address vanish,
//! as they would on UDP.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;

use super::DatagramSocket;

type Inbox = VecDeque<(Vec<u8>, SocketAddr)>;

/// Shared switchboard routing datagrams between [`MemorySocket`]s.
#[derive(Clone, Debug, Default)]
pub struct MemoryNetwork {
    inboxes: Arc<Mutex<HashMap<SocketAddr, Inbox>>>,
}

impl MemoryNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a socket at `addr`. Rebinding clears the old inbox.
    #[must_use]
    pub fn bind(&self, addr: SocketAddr) -> MemorySocket {
        self.inboxes.lock().insert(addr, VecDeque::new());
        MemorySocket {
            network: self.clone(),
            local_addr: addr,
        }
    }

    /// Number of datagrams waiting for `addr`.
    #[must_use]
    pub fn queued(&self, addr: SocketAddr) -> usize {
        self.inboxes.lock().get(&addr).map_or(0, VecDeque::len)
    }
}

/// One endpoint on a [`MemoryNetwork`].
#[derive(Clone, Debug)]
pub struct MemorySocket {
    network: MemoryNetwork,
    local_addr: SocketAddr,
}

impl MemorySocket {
    /// Address this socket is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl DatagramSocket for MemorySocket {
    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        let mut inboxes = self.network.inboxes.lock();
        let Some((bytes, from)) = inboxes
            .get_mut(&self.local_addr)
            .and_then(VecDeque::pop_front)
        else {
            return Ok(None);
        };

        // Oversized datagrams are truncated like a short UDP read buffer
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);
        Ok(Some((len, from)))
    }

    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize> {
        if let Some(inbox) = self.network.inboxes.lock().get_mut(&addr) {
            inbox.push_back((bytes.to_vec(), self.local_addr));
        }
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_and_source() {
        let network = MemoryNetwork::new();
        let a_addr: SocketAddr = "10.0.0.1:1".parse().unwrap();
        let b_addr: SocketAddr = "10.0.0.2:2".parse().unwrap();
        let mut a = network.bind(a_addr);
        let mut b = network.bind(b_addr);

        a.send_to(b"abc", b_addr).unwrap();
        assert_eq!(network.queued(b_addr), 1);

        let mut buf = [0u8; 16];
        assert_eq!(b.recv_from(&mut buf).unwrap(), Some((3, a_addr)));
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(b.recv_from(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_unbound_destination_drops() {
        let network = MemoryNetwork::new();
        let mut a = network.bind("10.0.0.1:1".parse().unwrap());
        let nowhere: SocketAddr = "10.0.0.9:9".parse().unwrap();
        assert_eq!(a.send_to(b"lost", nowhere).unwrap(), 4);
        assert_eq!(network.queued(nowhere), 0);
    }

    #[test]
    fn test_truncating_read() {
        let network = MemoryNetwork::new();
        let a_addr: SocketAddr = "10.0.0.1:1".parse().unwrap();
        let mut a = network.bind(a_addr);
        a.send_to(&[9u8; 10], a_addr).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(a.recv_from(&mut buf).unwrap(), Some((4, a_addr)));
    }
}

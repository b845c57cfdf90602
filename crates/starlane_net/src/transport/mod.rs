//! # Transport Layer
//!
//! Datagram I/O around a [`PacketManager`].
//!
//! ## Design
//!
//! - The manager never touches a socket; [`pump`] moves bytes between the
//!   two once per call
//! - Sockets are abstracted by [`DatagramSocket`] so the same loop runs over
//!   UDP ([`UdpTransport`]) or memory ([`MemoryNetwork`])
//! - Nothing here blocks: an empty socket ends the read phase

mod memory;

pub use memory::{MemoryNetwork, MemorySocket};

use std::io;
use std::net::SocketAddr;

use crate::manager::PacketManager;
use crate::protocol::serialize;

/// A non-blocking, connectionless datagram socket.
pub trait DatagramSocket {
    /// Reads one datagram into `buf`.
    ///
    /// Returns `Ok(None)` when nothing is waiting.
    ///
    /// # Errors
    ///
    /// Any socket failure other than "would block".
    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>>;

    /// Sends one datagram to `addr`.
    ///
    /// # Errors
    ///
    /// Any socket failure, including "would block".
    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize>;
}

/// UDP socket wrapper for game networking.
///
/// This is a thin wrapper around std UDP with:
/// - Non-blocking mode
/// - Packet statistics
#[derive(Debug)]
pub struct UdpTransport {
    /// The underlying socket.
    socket: std::net::UdpSocket,
    /// Local address.
    local_addr: SocketAddr,
    /// Statistics.
    stats: TransportStats,
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Datagrams sent.
    pub packets_sent: u64,
    /// Datagrams received.
    pub packets_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
    /// Receive errors.
    pub recv_errors: u64,
}

impl UdpTransport {
    /// Creates a new non-blocking transport bound to the specified address.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound or configured.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = std::net::UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        tracing::debug!(%local_addr, "udp transport bound");

        Ok(Self {
            socket,
            local_addr,
            stats: TransportStats::default(),
        })
    }

    /// Returns the local address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns statistics.
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TransportStats::default();
    }
}

impl DatagramSocket for UdpTransport {
    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok((len, addr)) => {
                self.stats.packets_received += 1;
                self.stats.bytes_received += len as u64;
                Ok(Some((len, addr)))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => {
                self.stats.recv_errors += 1;
                Err(e)
            }
        }
    }

    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize> {
        match self.socket.send_to(bytes, addr) {
            Ok(n) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += n as u64;
                Ok(n)
            }
            Err(e) => {
                self.stats.send_errors += 1;
                Err(e)
            }
        }
    }
}

/// What one [`pump`] cycle did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Datagrams read and accepted by the manager.
    pub received: usize,
    /// Datagrams read but rejected by the codec.
    pub dropped: usize,
    /// Zero-byte reads, ignored.
    pub empty_reads: usize,
    /// Datagrams written.
    pub sent: usize,
    /// Bytes written.
    pub bytes_sent: usize,
    /// Datagrams that failed to send and were discarded.
    pub send_errors: usize,
}

impl PumpReport {
    /// Adds another cycle's counts to this one.
    pub fn merge(&mut self, other: &Self) {
        self.received += other.received;
        self.dropped += other.dropped;
        self.empty_reads += other.empty_reads;
        self.sent += other.sent;
        self.bytes_sent += other.bytes_sent;
        self.send_errors += other.send_errors;
    }
}

/// Drives one I/O cycle for a single-peer manager.
///
/// Reads up to `max_reads_per_pump` datagrams into [`PacketManager::ingest`],
/// then drains the send queue to `remote`. A failed send discards that
/// datagram; the peer recovers it through an ack-request if it was reliable.
///
/// # Errors
///
/// Returns a receive error other than "would block".
pub fn pump<S: DatagramSocket>(
    manager: &PacketManager,
    socket: &mut S,
    remote: SocketAddr,
) -> io::Result<PumpReport> {
    let config = manager.config();
    let mut report = read_phase(
        socket,
        config.max_datagram_size,
        config.max_reads_per_pump,
        |bytes, from| manager.ingest(bytes, from).is_ok(),
    )?;

    for packet in manager.drain_send() {
        let bytes = serialize(&packet);
        send_one(socket, &bytes, remote, &mut report);
    }

    Ok(report)
}

/// Reads until the socket is empty or `max_reads` datagrams were seen.
///
/// `ingest` returns whether the datagram was accepted.
pub(crate) fn read_phase<S, F>(
    socket: &mut S,
    max_datagram_size: usize,
    max_reads: usize,
    mut ingest: F,
) -> io::Result<PumpReport>
where
    S: DatagramSocket,
    F: FnMut(&[u8], SocketAddr) -> bool,
{
    let mut report = PumpReport::default();
    let mut buf = vec![0u8; max_datagram_size];

    for _ in 0..max_reads {
        let Some((len, from)) = socket.recv_from(&mut buf)? else {
            break;
        };
        if len == 0 {
            report.empty_reads += 1;
            continue;
        }
        if ingest(&buf[..len], from) {
            report.received += 1;
        } else {
            report.dropped += 1;
        }
    }

    Ok(report)
}

pub(crate) fn send_one<S: DatagramSocket>(
    socket: &mut S,
    bytes: &[u8],
    to: SocketAddr,
    report: &mut PumpReport,
) {
    match socket.send_to(bytes, to) {
        Ok(n) => {
            report.sent += 1;
            report.bytes_sent += n;
        }
        Err(e) => {
            report.send_errors += 1;
            tracing::warn!(%to, error = %e, "send failed, datagram discarded");
        }
    }
}

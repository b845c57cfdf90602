//! # Packet Header
//!
//! Fixed 27-byte header present in every datagram, big-endian.
//!
//! ```text
//! offset  size  field
//! 0       4     seqid
//! 4       4     ack
//! 8       1     type
//! 9       4     auth
//! 13      4     client_addr
//! 17      2     client_port
//! 19      4     data_size
//! 23      4     original_size
//! 27      N     payload
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = 27;

/// IPv4 endpoint as carried on the wire.
///
/// Stamped by the receiving side from the socket-level source address; the
/// original sender never fills it in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Address octets.
    pub addr: [u8; 4],
    /// Port.
    pub port: u16,
}

impl Endpoint {
    /// `0.0.0.0:0`, meaning "not addressed".
    pub const UNSPECIFIED: Self = Self {
        addr: [0; 4],
        port: 0,
    };

    /// Creates an endpoint from octets and a port.
    #[inline]
    #[must_use]
    pub const fn new(addr: [u8; 4], port: u16) -> Self {
        Self { addr, port }
    }

    /// Returns true for `0.0.0.0:0`.
    #[inline]
    #[must_use]
    pub const fn is_unspecified(&self) -> bool {
        self.port == 0 && u32::from_be_bytes(self.addr) == 0
    }

    /// Converts back into a socket address.
    #[must_use]
    pub fn to_socket_addr(self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::from(self.addr), self.port))
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(addr.ip().octets(), addr.port())
    }
}

impl From<SocketAddr> for Endpoint {
    /// IPv4-mapped IPv6 senders are unmapped; other IPv6 senders keep only the port.
    fn from(addr: SocketAddr) -> Self {
        let octets = match addr.ip() {
            IpAddr::V4(ip) => ip.octets(),
            IpAddr::V6(ip) => ip.to_ipv4_mapped().map_or([0; 4], |v4| v4.octets()),
        };
        Self::new(octets, addr.port())
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_socket_addr()
    }
}

/// Packet header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacketHeader {
    /// Sequence number; 0 for unreliable packets.
    pub seqid: u32,
    /// Non-zero on ack-request frames: the sequence number being requested.
    pub ack: u32,
    /// Application-defined payload discriminator.
    pub kind: u8,
    /// Session token copied into every outgoing header.
    pub auth: u32,
    /// Sender endpoint, stamped on receipt.
    pub endpoint: Endpoint,
    /// Payload bytes following the header on the wire.
    pub data_size: u32,
    /// Non-zero when the payload is compressed: its decompressed length.
    pub original_size: u32,
}

impl PacketHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = HEADER_SIZE;

    /// Appends the encoded header to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.reserve(HEADER_SIZE);
        buf.extend_from_slice(&self.seqid.to_be_bytes());
        buf.extend_from_slice(&self.ack.to_be_bytes());
        buf.push(self.kind);
        buf.extend_from_slice(&self.auth.to_be_bytes());
        buf.extend_from_slice(&self.endpoint.addr);
        buf.extend_from_slice(&self.endpoint.port.to_be_bytes());
        buf.extend_from_slice(&self.data_size.to_be_bytes());
        buf.extend_from_slice(&self.original_size.to_be_bytes());
    }

    /// Decodes a header from the front of `bytes`.
    ///
    /// Returns `None` if fewer than [`HEADER_SIZE`] bytes are available.
    #[must_use]
    pub fn read_from(bytes: &[u8]) -> Option<Self> {
        let raw: &[u8; HEADER_SIZE] = bytes.get(..HEADER_SIZE)?.try_into().ok()?;
        let u32_at = |at: usize| u32::from_be_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]]);

        Some(Self {
            seqid: u32_at(0),
            ack: u32_at(4),
            kind: raw[8],
            auth: u32_at(9),
            endpoint: Endpoint::new(
                [raw[13], raw[14], raw[15], raw[16]],
                u16::from_be_bytes([raw[17], raw[18]]),
            ),
            data_size: u32_at(19),
            original_size: u32_at(23),
        })
    }
}

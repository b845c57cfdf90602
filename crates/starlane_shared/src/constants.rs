//! # Network Constants
//!
//! Values both sides of a session agree on.

/// Default UDP port for game traffic.
pub const SERVER_PORT: u16 = 4242;

/// Server bind address (accepts datagrams on all interfaces).
pub const SERVER_BIND: &str = "0.0.0.0:4242";

/// Largest datagram either side will read or write.
pub const MAX_PACKET_SIZE: usize = 2048;

//! # Starlane Net - Reliable Packet Transport
//!
//! Best-effort-reliable datagram transport for a fast-paced multiplayer
//! shooter.
//!
//! ## Architecture
//!
//! - **Protocol**: fixed 27-byte header, optional per-packet compression
//! - **Reliability**: sequence numbers on "important" packets only, gap
//!   detection on receive, ack-requests answered from a bounded history
//! - **Manager**: one [`PacketManager`] per connection, all state behind a
//!   single lock so receive and game threads can share it
//! - **Transport**: socket-agnostic [`pump`] plus a non-blocking UDP socket
//! - **Server**: [`PeerTable`] keeps a manager per remote peer
//!
//! Unreliable packets (seqid 0) are never acknowledged or retransmitted.
//! Reliable packets may arrive more than once; delivery is not exactly-once.
//!
//! ## Round trip
//!
//! ```text
//! SENDER                                RECEIVER
//!   |--- seq 1 ------------------------->|  recv_seqid = 1
//!   |--- seq 2 ---------X                |
//!   |--- seq 3 ------------------------->|  gap: 2 missing
//!   |<-- ack-request(2) -----------------|
//!   |--- seq 2 (from history) ---------->|  received = [1, 2, 3]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use starlane_net::PacketManager;
//!
//! let client = PacketManager::new();
//! let server = PacketManager::new();
//!
//! let bytes = client.send_reliable(b"join", 2);
//! server.ingest(&bytes, "127.0.0.1:5000".parse().unwrap()).unwrap();
//!
//! let packets = server.drain_received();
//! assert_eq!(packets[0].payload(), b"join");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod reliability;
pub mod server;
pub mod simulation;
pub mod transport;

// Re-exports for convenience
pub use config::TransportConfig;
pub use dispatch::PacketHandler;
pub use error::{TransportError, TransportResult};
pub use manager::{Ingested, ManagerStats, PacketManager};
pub use protocol::{Endpoint, Frame, Packet, PacketHeader, HEADER_SIZE};
pub use reliability::{Arrival, PACKET_HISTORY_SIZE};
pub use server::PeerTable;
pub use simulation::{LossyLink, NetworkConditions};
pub use transport::{pump, DatagramSocket, MemoryNetwork, PumpReport, UdpTransport};

//! # Wire Protocol
//!
//! Header layout, packet ownership, framing and payload compression.
//!
//! ## Datagram Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (27 bytes, big-endian)                                │
//! ├──────────────────────────────────────────────────────────────┤
//! │ seqid (4) │ ack (4) │ type (1) │ auth (4) │ addr (4) │ port (2)│
//! │ data_size (4) │ original_size (4)                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (data_size bytes, possibly compressed)               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod compression;
mod header;
mod packet;
mod serialization;

pub use compression::{
    compress_if_smaller, compress_packet, decompress, decompress_packet, COMPRESSION_THRESHOLD,
    MAX_DECOMPRESSED_SIZE,
};
pub use header::{Endpoint, PacketHeader, HEADER_SIZE};
pub use packet::{Frame, Packet};
pub use serialization::{deserialize, serialize};

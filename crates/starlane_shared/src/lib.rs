//! # Starlane Shared
//!
//! Common types used by both client and server.
//!
//! The transport (`starlane_net`) treats payloads as opaque bytes tagged with a
//! one-byte kind. This crate gives those kinds names and gives each payload a
//! fixed binary layout.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod protocol;

pub use constants::{MAX_PACKET_SIZE, SERVER_BIND, SERVER_PORT};
pub use protocol::{
    EntityDestroy, JoinRoom, JoinRoomAccepted, PacketKind, Payload, PlayerInput, PlayerState,
    UnknownPacketKind,
};

//! # Packets and Frames
//!
//! A [`Packet`] owns its payload outright. Buffers move between queues and
//! are deep-copied (via `Clone`) whenever a second owner is needed, as for
//! the retransmission history.

use super::header::{Endpoint, PacketHeader};

/// Header plus an exclusively owned payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Packet {
    /// Packet header.
    pub header: PacketHeader,
    /// Payload bytes, `header.data_size` long. Empty when there is none.
    pub data: Vec<u8>,
}

/// Borrowed, tagged view of a packet.
///
/// Ack-requests share the data-frame wire layout; this view keeps the
/// "`ack` set means no payload" convention out of application code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Application payload. `seqid` is 0 for unreliable packets.
    Data {
        /// Sequence number.
        seqid: u32,
        /// Payload discriminator.
        kind: u8,
        /// Payload bytes.
        payload: &'a [u8],
    },
    /// Request to retransmit the reliable packet `seqid`.
    AckRequest {
        /// Requested sequence number.
        seqid: u32,
    },
}

impl Packet {
    /// Creates an unsequenced data packet; the manager assigns `seqid` and `auth`.
    #[must_use]
    pub fn data(kind: u8, payload: Vec<u8>) -> Self {
        Self {
            header: PacketHeader {
                kind,
                data_size: wire_len(payload.len()),
                ..PacketHeader::default()
            },
            data: payload,
        }
    }

    /// Creates a payload-less request for the retransmission of `seqid`.
    #[must_use]
    pub fn ack_request(seqid: u32, auth: u32, endpoint: Endpoint) -> Self {
        Self {
            header: PacketHeader {
                ack: seqid,
                auth,
                endpoint,
                ..PacketHeader::default()
            },
            data: Vec::new(),
        }
    }

    /// Returns the tagged view of this packet.
    #[must_use]
    pub fn frame(&self) -> Frame<'_> {
        if self.header.ack != 0 {
            Frame::AckRequest {
                seqid: self.header.ack,
            }
        } else {
            Frame::Data {
                seqid: self.header.seqid,
                kind: self.header.kind,
                payload: &self.data,
            }
        }
    }

    /// Sequence number (0 for unreliable packets and ack-requests).
    #[inline]
    #[must_use]
    pub const fn seqid(&self) -> u32 {
        self.header.seqid
    }

    /// Payload discriminator.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> u8 {
        self.header.kind
    }

    /// Payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    /// True for sequenced (reliable) data packets.
    #[inline]
    #[must_use]
    pub const fn is_reliable(&self) -> bool {
        self.header.seqid != 0 && self.header.ack == 0
    }

    /// True for ack-request frames.
    #[inline]
    #[must_use]
    pub const fn is_ack_request(&self) -> bool {
        self.header.ack != 0
    }

    /// Replaces the payload and keeps `data_size` in step.
    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.header.data_size = wire_len(payload.len());
        self.data = payload;
    }

    /// Length of this packet once serialized.
    #[inline]
    #[must_use]
    pub fn wire_size(&self) -> usize {
        PacketHeader::SIZE + self.data.len()
    }
}

/// Payload length as carried in the header.
///
/// Datagrams are far below 4 GiB; saturate rather than wrap if that ever changes.
#[inline]
pub(crate) fn wire_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

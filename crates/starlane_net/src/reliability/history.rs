//! # Retransmission History
//!
//! Bounded FIFO of deep copies of sent reliable packets.
//!
//! Capacity trades memory for loss tolerance: once more than `capacity`
//! reliable packets have been sent after a given one, that packet is gone
//! and an ack-request for it is a miss.

use std::collections::VecDeque;

use crate::protocol::Packet;

/// Default number of reliable packets kept for retransmission.
pub const PACKET_HISTORY_SIZE: usize = 512;

/// Bounded store of previously sent reliable packets.
#[derive(Clone, Debug)]
pub struct PacketHistory {
    entries: VecDeque<Packet>,
    capacity: usize,
}

impl PacketHistory {
    /// Creates an empty history holding at most `capacity` packets (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Stores a deep copy of `packet`, evicting the oldest entry when full.
    pub fn record(&mut self, packet: &Packet) {
        if self.entries.len() >= self.capacity {
            // Dropping the evicted packet frees its payload
            self.entries.pop_front();
        }
        self.entries.push_back(packet.clone());
    }

    /// Returns the first stored packet with this sequence number.
    #[must_use]
    pub fn find(&self, seqid: u32) -> Option<&Packet> {
        self.entries.iter().find(|p| p.header.seqid == seqid)
    }

    /// Number of stored packets.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of stored packets.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sequence number of the oldest stored packet.
    #[must_use]
    pub fn oldest_seqid(&self) -> Option<u32> {
        self.entries.front().map(|p| p.header.seqid)
    }

    /// Drops every stored packet.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for PacketHistory {
    fn default() -> Self {
        Self::with_capacity(PACKET_HISTORY_SIZE)
    }
}

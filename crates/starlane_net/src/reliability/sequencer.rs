//! # Receive Sequencer
//!
//! Receiver-side gap detection for sequenced packets.
//!
//! `recv_seqid` is the highest sequence number seen. A packet above it
//! advances it and marks every number skipped in between as missing. The
//! missing set feeds ack-requests and is drained each time they are queued.
//! Gaps are also remembered as *outstanding* until they are filled, so lost
//! ack-requests can be re-sent later.
//!
//! Comparison is plain unsigned `>`; sequence numbers are not treated as
//! wrapping.

use std::collections::BTreeSet;

use super::history::PACKET_HISTORY_SIZE;

/// What an arriving sequence number did to the receive state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arrival {
    /// `seqid == 0`: no ordering state involved.
    Unsequenced,
    /// Exactly `recv_seqid + 1`.
    InOrder,
    /// Jumped ahead; `missing` numbers were newly marked missing.
    Ahead {
        /// Count of newly missing sequence numbers.
        missing: u32,
    },
    /// At or below `recv_seqid`: late, retransmitted or duplicated.
    Late {
        /// True if it filled an outstanding gap.
        filled_gap: bool,
    },
}

/// Tracks the highest received sequence number and the gaps below it.
#[derive(Clone, Debug)]
pub struct ReceiveSequencer {
    recv_seqid: u32,
    missing: Vec<u32>,
    outstanding: BTreeSet<u32>,
    window: u32,
}

impl ReceiveSequencer {
    /// Creates a sequencer that tracks gaps at most `window` below `recv_seqid`.
    ///
    /// The window should match the sender's history capacity: anything
    /// older cannot be retransmitted.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            recv_seqid: 0,
            missing: Vec::new(),
            outstanding: BTreeSet::new(),
            window: u32::try_from(window.max(1)).unwrap_or(u32::MAX),
        }
    }

    /// Highest sequence number accepted so far.
    #[inline]
    #[must_use]
    pub const fn recv_seqid(&self) -> u32 {
        self.recv_seqid
    }

    /// Sequence numbers waiting for an ack-request.
    #[must_use]
    pub fn missing(&self) -> &[u32] {
        &self.missing
    }

    /// Gaps not yet filled, ascending.
    pub fn outstanding(&self) -> impl Iterator<Item = u32> + '_ {
        self.outstanding.iter().copied()
    }

    /// Number of unfilled gaps.
    #[must_use]
    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    /// Records an arriving sequence number.
    ///
    /// A jump marks at most `window` numbers missing; skipped numbers older
    /// than the window are never requested.
    pub fn accept(&mut self, seqid: u32) -> Arrival {
        if seqid == 0 {
            return Arrival::Unsequenced;
        }

        self.missing.retain(|&s| s != seqid);
        let filled_gap = self.outstanding.remove(&seqid);

        if seqid <= self.recv_seqid {
            return Arrival::Late { filled_gap };
        }

        let in_order = seqid == self.recv_seqid + 1;

        // Skipped numbers older than the window are unrecoverable; bounding
        // here also caps the work a forged huge seqid can cause.
        let first_missing = (self.recv_seqid + 1).max(seqid.saturating_sub(self.window));
        for lost in first_missing..seqid {
            self.missing.push(lost);
            self.outstanding.insert(lost);
        }
        let missing = seqid - first_missing;

        self.recv_seqid = seqid;
        self.prune();

        if in_order {
            Arrival::InOrder
        } else {
            Arrival::Ahead { missing }
        }
    }

    /// Drains the missing set.
    pub fn take_missing(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.missing)
    }

    /// Resets to the initial state.
    pub fn reset(&mut self) {
        self.recv_seqid = 0;
        self.missing.clear();
        self.outstanding.clear();
    }

    /// Continues a sequence already partly received elsewhere.
    ///
    /// Everything up to `seqid` counts as received and no gaps are tracked.
    pub fn resume_at(&mut self, seqid: u32) {
        self.recv_seqid = seqid;
        self.missing.clear();
        self.outstanding.clear();
    }

    fn prune(&mut self) {
        let floor = self.recv_seqid.saturating_sub(self.window);
        if floor > 0 {
            self.outstanding = self.outstanding.split_off(&floor);
        }
    }
}

impl Default for ReceiveSequencer {
    fn default() -> Self {
        Self::new(PACKET_HISTORY_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_order() {
        let mut seq = ReceiveSequencer::default();
        assert_eq!(seq.accept(1), Arrival::InOrder);
        assert_eq!(seq.accept(2), Arrival::InOrder);
        assert_eq!(seq.recv_seqid(), 2);
        assert!(seq.missing().is_empty());
    }

    #[test]
    fn test_unsequenced_ignored() {
        let mut seq = ReceiveSequencer::default();
        seq.accept(5);
        let missing_before = seq.missing().to_vec();
        assert_eq!(seq.accept(0), Arrival::Unsequenced);
        assert_eq!(seq.recv_seqid(), 5);
        assert_eq!(seq.missing(), missing_before.as_slice());
    }

    #[test]
    fn test_gap_detection() {
        let mut seq = ReceiveSequencer::default();
        assert_eq!(seq.accept(1), Arrival::InOrder);
        assert_eq!(seq.accept(4), Arrival::Ahead { missing: 2 });
        assert_eq!(seq.recv_seqid(), 4);
        assert_eq!(seq.take_missing(), vec![2, 3]);
        assert!(seq.missing().is_empty());
        assert_eq!(seq.outstanding().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_late_arrival_fills_gap() {
        let mut seq = ReceiveSequencer::default();
        seq.accept(1);
        seq.accept(4);
        assert_eq!(seq.accept(3), Arrival::Late { filled_gap: true });
        assert_eq!(seq.recv_seqid(), 4);
        assert_eq!(seq.missing(), &[2]);
        assert_eq!(seq.outstanding().collect::<Vec<_>>(), vec![2]);

        // Duplicate of an already received packet
        assert_eq!(seq.accept(1), Arrival::Late { filled_gap: false });
    }

    #[test]
    fn test_first_packet_gap_starts_at_one() {
        let mut seq = ReceiveSequencer::default();
        assert_eq!(seq.accept(3), Arrival::Ahead { missing: 2 });
        assert_eq!(seq.take_missing(), vec![1, 2]);
    }

    #[test]
    fn test_gap_bounded_by_window() {
        let mut seq = ReceiveSequencer::new(8);
        seq.accept(1);
        assert_eq!(seq.accept(1_000_000), Arrival::Ahead { missing: 8 });
        let missing = seq.take_missing();
        assert_eq!(missing.len(), 8);
        assert_eq!(missing[0], 999_992);
        assert_eq!(seq.recv_seqid(), 1_000_000);
    }

    #[test]
    fn test_forged_max_seqid() {
        let mut seq = ReceiveSequencer::new(4);
        assert_eq!(seq.accept(u32::MAX), Arrival::Ahead { missing: 4 });
        assert_eq!(seq.recv_seqid(), u32::MAX);
        // Nothing can advance past the top; everything else is late
        assert_eq!(seq.accept(7), Arrival::Late { filled_gap: false });
    }

    #[test]
    fn test_outstanding_pruned() {
        let mut seq = ReceiveSequencer::new(4);
        seq.accept(1);
        seq.accept(3);
        assert_eq!(seq.outstanding().collect::<Vec<_>>(), vec![2]);
        seq.accept(10);
        // Gap 2 is now more than 4 below recv_seqid
        assert!(seq.outstanding().all(|s| s >= 6));
        assert!(!seq.outstanding().any(|s| s == 2));
    }

    #[test]
    fn test_reset() {
        let mut seq = ReceiveSequencer::default();
        seq.accept(9);
        seq.reset();
        assert_eq!(seq.recv_seqid(), 0);
        assert!(seq.missing().is_empty());
        assert_eq!(seq.outstanding_len(), 0);
    }

    #[test]
    fn test_resume_at() {
        let mut seq = ReceiveSequencer::default();
        seq.accept(1);
        seq.accept(5);
        seq.resume_at(3);
        assert_eq!(seq.recv_seqid(), 3);
        assert!(seq.missing().is_empty());
        assert_eq!(seq.outstanding_len(), 0);

        assert_eq!(seq.accept(4), Arrival::InOrder);
        assert_eq!(seq.accept(2), Arrival::Late { filled_gap: false });
    }
}

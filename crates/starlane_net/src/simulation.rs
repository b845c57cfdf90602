//! # Network Simulation
//!
//! Simulates bad links for testing the reliability path.
//!
//! ## Features
//!
//! - Packet loss
//! - Duplication
//! - Reordering (a held datagram is released after the next one)
//!
//! Randomness comes from a seeded RNG so a failing run can be replayed.

use std::io;
use std::net::SocketAddr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::transport::DatagramSocket;

/// Network conditions for simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkConditions {
    /// Packet loss percentage (0-100).
    pub packet_loss_percent: u8,
    /// Duplicate packet percentage (0-100).
    pub duplicate_percent: u8,
    /// Out-of-order percentage (0-100).
    pub out_of_order_percent: u8,
}

impl NetworkConditions {
    /// Perfect network conditions (LAN).
    pub const PERFECT: Self = Self {
        packet_loss_percent: 0,
        duplicate_percent: 0,
        out_of_order_percent: 0,
    };

    /// Average network conditions (cable).
    pub const AVERAGE: Self = Self {
        packet_loss_percent: 1,
        duplicate_percent: 1,
        out_of_order_percent: 2,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        packet_loss_percent: 5,
        duplicate_percent: 2,
        out_of_order_percent: 5,
    };

    /// Hostile conditions for soak tests.
    pub const TERRIBLE: Self = Self {
        packet_loss_percent: 20,
        duplicate_percent: 10,
        out_of_order_percent: 15,
    };

    /// Returns true if packet should be dropped.
    #[must_use]
    pub fn should_drop(&self, roll: u8) -> bool {
        roll < self.packet_loss_percent
    }

    /// Returns true if packet should be sent twice.
    #[must_use]
    pub fn should_duplicate(&self, roll: u8) -> bool {
        roll < self.duplicate_percent
    }

    /// Returns true if packet should be held back.
    #[must_use]
    pub fn should_reorder(&self, roll: u8) -> bool {
        roll < self.out_of_order_percent
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::AVERAGE
    }
}

/// What a [`LossyLink`] did to outgoing datagrams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Datagrams handed to the inner socket, duplicates included.
    pub forwarded: u64,
    /// Datagrams silently discarded.
    pub dropped: u64,
    /// Extra copies sent.
    pub duplicated: u64,
    /// Datagrams delivered after a later one.
    pub reordered: u64,
}

/// Socket wrapper degrading outgoing traffic.
///
/// Receives pass through untouched.
#[derive(Debug)]
pub struct LossyLink<S> {
    inner: S,
    conditions: NetworkConditions,
    rng: StdRng,
    held: Option<(Vec<u8>, SocketAddr)>,
    stats: LinkStats,
}

impl<S: DatagramSocket> LossyLink<S> {
    /// Wraps `inner` with the given conditions and RNG seed.
    #[must_use]
    pub fn new(inner: S, conditions: NetworkConditions, seed: u64) -> Self {
        Self {
            inner,
            conditions,
            rng: StdRng::seed_from_u64(seed),
            held: None,
            stats: LinkStats::default(),
        }
    }

    /// Active conditions.
    #[must_use]
    pub const fn conditions(&self) -> NetworkConditions {
        self.conditions
    }

    /// Replaces the conditions.
    pub fn set_conditions(&mut self, conditions: NetworkConditions) {
        self.conditions = conditions;
    }

    /// Returns statistics.
    #[must_use]
    pub const fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Sends any held datagram now.
    ///
    /// # Errors
    ///
    /// Send error of the inner socket.
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some((bytes, addr)) = self.held.take() {
            self.forward(&bytes, addr)?;
        }
        Ok(())
    }

    /// Borrows the inner socket.
    #[must_use]
    pub const fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwraps the inner socket, discarding any held datagram.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn roll(&mut self) -> u8 {
        self.rng.gen_range(0..100)
    }

    fn forward(&mut self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize> {
        let n = self.inner.send_to(bytes, addr)?;
        self.stats.forwarded += 1;
        Ok(n)
    }
}

impl<S: DatagramSocket> DatagramSocket for LossyLink<S> {
    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        self.inner.recv_from(buf)
    }

    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> io::Result<usize> {
        let drop_roll = self.roll();
        if self.conditions.should_drop(drop_roll) {
            self.stats.dropped += 1;
            tracing::trace!(%addr, len = bytes.len(), "simulated loss");
            return Ok(bytes.len());
        }

        let reorder_roll = self.roll();
        if self.held.is_none() && self.conditions.should_reorder(reorder_roll) {
            self.held = Some((bytes.to_vec(), addr));
            self.stats.reordered += 1;
            return Ok(bytes.len());
        }

        let n = self.forward(bytes, addr)?;

        let dup_roll = self.roll();
        if self.conditions.should_duplicate(dup_roll) {
            self.forward(bytes, addr)?;
            self.stats.duplicated += 1;
        }

        self.flush()?;
        Ok(n)
    }
}

//! # Packet Manager
//!
//! Per-connection transport state behind a single lock.
//!
//! ## Flow
//!
//! ```text
//! send:    payload ─► compress? ─► seqid? ─► history ─► outbound queue ─► drain_send()
//! receive: datagram ─► deserialize ─► decompress ─► stamp endpoint ─► sequencer ─► received queue ─► drain_received()
//!                                                                        └─► ack-requests ─► outbound queue
//! ```
//!
//! ## Concurrency
//!
//! Every public method takes the same `parking_lot::Mutex` for its whole
//! duration, so a receive thread calling [`PacketManager::ingest`] and a
//! game thread calling [`PacketManager::drain_received`] are linearized.
//! Gap detection, ack-request generation and the advance of `recv_seqid`
//! happen as one unit under that lock. No method blocks on I/O.
//!
//! Decoding (framing and decompression) is pure and runs before the lock is
//! taken; a datagram that fails to decode never touches the sequencing state.

use std::net::SocketAddr;

use parking_lot::Mutex;

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::protocol::{
    compress_packet, decompress_packet, deserialize, serialize, Endpoint, Frame, Packet,
};
use crate::reliability::{Arrival, PacketHistory, ReceiveSequencer};

/// Result of ingesting one well-formed datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ingested {
    /// A data packet was queued for the application.
    Delivered {
        /// Its sequence number (0 if unreliable).
        seqid: u32,
        /// Effect on the receive sequence.
        arrival: Arrival,
    },
    /// An ack-request matched the history; a copy was queued for sending.
    Retransmitted {
        /// The requested sequence number.
        seqid: u32,
    },
    /// An ack-request named a packet that is not (or no longer) in history.
    HistoryMiss {
        /// The requested sequence number.
        seqid: u32,
    },
}

/// Counters for one manager. Reset by [`PacketManager::clean`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Data packets queued by the application.
    pub packets_queued: u64,
    /// Of those, reliable ones.
    pub reliable_queued: u64,
    /// Payloads sent compressed.
    pub packets_compressed: u64,
    /// Ack-requests queued because of detected gaps.
    pub ack_requests_queued: u64,
    /// Data packets handed to the received queue.
    pub packets_delivered: u64,
    /// History copies queued in answer to ack-requests.
    pub retransmissions: u64,
    /// Ack-requests that missed the history.
    pub history_misses: u64,
    /// Datagrams dropped at the codec boundary.
    pub datagrams_dropped: u64,
    /// Frames queued larger than `max_datagram_size`.
    pub oversized_frames: u64,
}

/// Mutable state guarded by the manager lock.
#[derive(Debug)]
struct ManagerState {
    config: TransportConfig,
    send_seqid: u32,
    auth_key: u32,
    history: PacketHistory,
    sequencer: ReceiveSequencer,
    received: Vec<Packet>,
    outbound: Vec<Packet>,
    last_peer: Endpoint,
    stats: ManagerStats,
}

impl ManagerState {
    fn new(config: TransportConfig) -> Self {
        Self {
            send_seqid: 0,
            auth_key: 0,
            history: PacketHistory::with_capacity(config.history_capacity),
            sequencer: ReceiveSequencer::new(config.history_capacity),
            received: Vec::new(),
            outbound: Vec::new(),
            last_peer: Endpoint::UNSPECIFIED,
            stats: ManagerStats::default(),
            config,
        }
    }

    fn next_seqid(&mut self) -> u32 {
        // Plain increment; 0 is reserved for unreliable packets
        self.send_seqid = self.send_seqid.wrapping_add(1).max(1);
        self.send_seqid
    }

    fn enqueue(&mut self, payload: &[u8], kind: u8, important: bool) -> Vec<u8> {
        let mut packet = Packet::data(kind, payload.to_vec());
        packet.header.auth = self.auth_key;

        if self.config.compression
            && compress_packet(&mut packet, self.config.compression_threshold)
        {
            self.stats.packets_compressed += 1;
        }

        if important {
            packet.header.seqid = self.next_seqid();
            self.history.record(&packet);
            self.stats.reliable_queued += 1;
        }

        tracing::trace!(
            seqid = packet.header.seqid,
            kind,
            size = packet.data.len(),
            "queued packet"
        );

        let bytes = serialize(&packet);
        if bytes.len() > self.config.max_datagram_size {
            // Receivers truncate at this size, so the frame cannot arrive intact
            self.stats.oversized_frames += 1;
            tracing::warn!(
                seqid = packet.header.seqid,
                kind,
                size = bytes.len(),
                max = self.config.max_datagram_size,
                "frame exceeds max datagram size"
            );
        }
        self.outbound.push(packet);
        self.stats.packets_queued += 1;
        bytes
    }

    fn process(&mut self, packet: Packet) -> Ingested {
        let peer = packet.header.endpoint;
        self.last_peer = peer;

        match packet.frame() {
            Frame::AckRequest { seqid } => self.resend(seqid, peer),
            Frame::Data { seqid, .. } => {
                let arrival = self.sequencer.accept(seqid);
                if let Arrival::Ahead { missing } = arrival {
                    tracing::debug!(seqid, missing, "sequence gap detected");
                    self.queue_missing_acks(peer);
                }
                self.insert_received(packet);
                self.stats.packets_delivered += 1;
                Ingested::Delivered { seqid, arrival }
            }
        }
    }

    fn resend(&mut self, seqid: u32, peer: Endpoint) -> Ingested {
        match self.history.find(seqid) {
            Some(stored) => {
                let mut copy = stored.clone();
                copy.header.endpoint = peer;
                self.outbound.push(copy);
                self.stats.retransmissions += 1;
                tracing::trace!(seqid, "retransmitting");
                Ingested::Retransmitted { seqid }
            }
            None => {
                self.stats.history_misses += 1;
                tracing::debug!(seqid, "ack-request for packet not in history");
                Ingested::HistoryMiss { seqid }
            }
        }
    }

    fn queue_missing_acks(&mut self, peer: Endpoint) -> usize {
        let missing = self.sequencer.take_missing();
        let count = missing.len();
        for seqid in missing {
            self.outbound
                .push(Packet::ack_request(seqid, self.auth_key, peer));
        }
        self.stats.ack_requests_queued += count as u64;
        count
    }

    /// Keeps `received` ordered by seqid; equal seqids stay in arrival order.
    fn insert_received(&mut self, packet: Packet) {
        let seqid = packet.header.seqid;
        let at = self.received.partition_point(|p| p.header.seqid <= seqid);
        self.received.insert(at, packet);
    }
}

/// Reliable packet transport for one connection.
///
/// Thread-safe; share it behind an `Arc`.
#[derive(Debug)]
pub struct PacketManager {
    state: Mutex<ManagerState>,
}

impl PacketManager {
    /// Creates a manager with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Creates a manager with the given configuration.
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        Self {
            state: Mutex::new(ManagerState::new(config)),
        }
    }

    // ========================================================================
    // Send path
    // ========================================================================

    /// Builds a packet, queues it for sending and returns its wire bytes.
    ///
    /// Important packets get the next sequence number and a copy is kept in
    /// the retransmission history. Unimportant ones are sent with seqid 0.
    pub fn enqueue_send(&self, payload: &[u8], kind: u8, important: bool) -> Vec<u8> {
        self.state.lock().enqueue(payload, kind, important)
    }

    /// Queues a sequenced, retransmittable packet.
    pub fn send_reliable(&self, payload: &[u8], kind: u8) -> Vec<u8> {
        self.enqueue_send(payload, kind, true)
    }

    /// Queues a fire-and-forget packet.
    pub fn send_unreliable(&self, payload: &[u8], kind: u8) -> Vec<u8> {
        self.enqueue_send(payload, kind, false)
    }

    /// Takes every queued outbound packet, including ack-requests and
    /// retransmissions.
    #[must_use]
    pub fn drain_send(&self) -> Vec<Packet> {
        std::mem::take(&mut self.state.lock().outbound)
    }

    /// Queues an ack-request for every sequence number in the missing set
    /// and clears it. Returns the number queued.
    pub fn ack_missing(&self) -> usize {
        let mut state = self.state.lock();
        let peer = state.last_peer;
        state.queue_missing_acks(peer)
    }

    /// Re-requests every gap that has not been filled yet.
    ///
    /// Covers ack-requests (or their answers) lost on the way. Returns the
    /// number of ack-requests queued.
    pub fn request_outstanding(&self) -> usize {
        let mut state = self.state.lock();
        let peer = state.last_peer;
        let auth = state.auth_key;
        let gaps: Vec<u32> = state.sequencer.outstanding().collect();
        for &seqid in &gaps {
            state.outbound.push(Packet::ack_request(seqid, auth, peer));
        }
        state.stats.ack_requests_queued += gaps.len() as u64;
        gaps.len()
    }

    // ========================================================================
    // Receive path
    // ========================================================================

    /// Decodes a datagram from `sender` and runs it through sequencing.
    ///
    /// # Errors
    ///
    /// Malformed, size-mismatched or undecompressable datagrams are rejected
    /// with the matching [`TransportError`]; the caller should drop them.
    /// The sequencing state and queues are left untouched.
    pub fn ingest(&self, bytes: &[u8], sender: SocketAddr) -> TransportResult<Ingested> {
        let mut packet = match decode(bytes) {
            Ok(packet) => packet,
            Err(err) => {
                tracing::debug!(%sender, len = bytes.len(), error = %err, "dropping datagram");
                self.state.lock().stats.datagrams_dropped += 1;
                return Err(err);
            }
        };
        packet.header.endpoint = Endpoint::from(sender);

        Ok(self.state.lock().process(packet))
    }

    /// Takes every received data packet, ordered by ascending seqid.
    #[must_use]
    pub fn drain_received(&self) -> Vec<Packet> {
        std::mem::take(&mut self.state.lock().received)
    }

    /// Alias of [`PacketManager::drain_received`] for game code.
    #[must_use]
    pub fn receive_all(&self) -> Vec<Packet> {
        self.drain_received()
    }

    // ========================================================================
    // Session and settings
    // ========================================================================

    /// Treats every sequence number up to `seqid` as already received.
    ///
    /// For a connection whose first packets arrived through another
    /// manager. Clears tracked gaps.
    pub fn set_recv_seqid(&self, seqid: u32) {
        self.state.lock().sequencer.resume_at(seqid);
    }

    /// Resets sequence numbers, history, gaps and both queues.
    ///
    /// Auth key and configuration are kept.
    pub fn clean(&self) {
        let mut state = self.state.lock();
        let auth_key = state.auth_key;
        let config = state.config.clone();
        *state = ManagerState::new(config);
        state.auth_key = auth_key;
    }

    /// Turns payload compression on or off for subsequent sends.
    pub fn set_compression(&self, enabled: bool) {
        self.state.lock().config.compression = enabled;
    }

    /// Whether payload compression is on.
    #[must_use]
    pub fn compression_enabled(&self) -> bool {
        self.state.lock().config.compression
    }

    /// Sets the session token copied into outgoing headers.
    pub fn set_auth_key(&self, key: u32) {
        self.state.lock().auth_key = key;
    }

    /// Session token copied into outgoing headers.
    #[must_use]
    pub fn auth_key(&self) -> u32 {
        self.state.lock().auth_key
    }

    /// Last sequence number assigned to a reliable packet.
    #[must_use]
    pub fn send_seqid(&self) -> u32 {
        self.state.lock().send_seqid
    }

    /// Highest sequence number received.
    #[must_use]
    pub fn recv_seqid(&self) -> u32 {
        self.state.lock().sequencer.recv_seqid()
    }

    /// Number of packets in the retransmission history.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    /// Number of packets waiting in the outbound queue.
    #[must_use]
    pub fn pending_send(&self) -> usize {
        self.state.lock().outbound.len()
    }

    /// Number of packets waiting in the received queue.
    #[must_use]
    pub fn pending_received(&self) -> usize {
        self.state.lock().received.len()
    }

    /// Gaps not yet filled, ascending.
    #[must_use]
    pub fn outstanding_gaps(&self) -> Vec<u32> {
        self.state.lock().sequencer.outstanding().collect()
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        self.state.lock().stats
    }

    /// Copy of the active configuration.
    #[must_use]
    pub fn config(&self) -> TransportConfig {
        self.state.lock().config.clone()
    }
}

impl Default for PacketManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames and decompresses a datagram without touching manager state.
fn decode(bytes: &[u8]) -> TransportResult<Packet> {
    let mut packet = deserialize(bytes)?;
    if packet.is_ack_request() && !packet.data.is_empty() {
        return Err(TransportError::SizeMismatch {
            declared: 0,
            actual: packet.data.len(),
        });
    }
    decompress_packet(&mut packet)?;
    Ok(packet)
}

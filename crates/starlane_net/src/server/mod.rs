//! # Server Peer Routing
//!
//! One socket, many peers.
//!
//! ## Design
//!
//! - Each registered peer owns a [`PacketManager`], so sequence numbers,
//!   history and gaps are tracked per connection
//! - Datagrams from unknown senders go to a global manager; game code reads
//!   join requests from it and registers the sender
//! - A new peer manager resumes the sender's sequence after the last
//!   reliable packet the global manager delivered from it
//! - Outgoing frames are addressed by the peer they belong to; global frames
//!   by the endpoint in their header

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::TransportConfig;
use crate::error::TransportResult;
use crate::manager::{Ingested, PacketManager};
use crate::protocol::{serialize, Endpoint};
use crate::transport::{read_phase, send_one, DatagramSocket, PumpReport};

/// Unregistered senders remembered for sequence seeding.
const MAX_TRACKED_SENDERS: usize = 1024;

/// Per-peer packet managers behind a shared socket.
#[derive(Debug)]
pub struct PeerTable {
    /// Configuration for every manager created by this table.
    config: TransportConfig,
    /// Manager for senders that are not registered.
    global: Arc<PacketManager>,
    /// Registered peers.
    peers: RwLock<HashMap<SocketAddr, Arc<PacketManager>>>,
    /// Highest reliable seqid the global manager delivered per sender.
    global_seen: Mutex<HashMap<SocketAddr, u32>>,
}

impl PeerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self {
            global: Arc::new(PacketManager::with_config(config.clone())),
            peers: RwLock::new(HashMap::new()),
            global_seen: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Manager for unregistered senders.
    #[must_use]
    pub fn global(&self) -> &Arc<PacketManager> {
        &self.global
    }

    /// Returns the manager for `addr`, creating it if needed.
    ///
    /// A new manager starts after the last reliable seqid the global manager
    /// delivered from `addr`, so packets already received there are not
    /// requested again.
    pub fn register(&self, addr: SocketAddr) -> Arc<PacketManager> {
        let mut peers = self.peers.write();
        Arc::clone(peers.entry(addr).or_insert_with(|| {
            let manager = PacketManager::with_config(self.config.clone());
            let seen = self.global_seen.lock().remove(&addr).unwrap_or(0);
            manager.set_recv_seqid(seen);
            tracing::debug!(%addr, recv_seqid = seen, "peer registered");
            Arc::new(manager)
        }))
    }

    /// Forgets a peer. Its manager is dropped with the last `Arc`.
    pub fn remove(&self, addr: SocketAddr) -> Option<Arc<PacketManager>> {
        self.global_seen.lock().remove(&addr);
        let removed = self.peers.write().remove(&addr);
        if removed.is_some() {
            tracing::debug!(%addr, "peer removed");
        }
        removed
    }

    /// Manager of a registered peer.
    #[must_use]
    pub fn get(&self, addr: SocketAddr) -> Option<Arc<PacketManager>> {
        self.peers.read().get(&addr).cloned()
    }

    /// Whether `addr` is registered.
    #[must_use]
    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.peers.read().contains_key(&addr)
    }

    /// Registered peer addresses.
    #[must_use]
    pub fn peers(&self) -> Vec<SocketAddr> {
        self.peers.read().keys().copied().collect()
    }

    /// Number of registered peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// True if no peer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Feeds a datagram to the sender's manager, or the global one.
    ///
    /// # Errors
    ///
    /// Propagates the codec error of [`PacketManager::ingest`].
    pub fn route(&self, bytes: &[u8], from: SocketAddr) -> TransportResult<Ingested> {
        match self.get(from) {
            Some(peer) => peer.ingest(bytes, from),
            None => {
                let outcome = self.global.ingest(bytes, from)?;
                if let Ingested::Delivered {
                    seqid: seqid @ 1..,
                    ..
                } = outcome
                {
                    self.note_global_seqid(from, seqid);
                }
                Ok(outcome)
            }
        }
    }

    fn note_global_seqid(&self, from: SocketAddr, seqid: u32) {
        let mut seen = self.global_seen.lock();
        if !seen.contains_key(&from) && seen.len() >= MAX_TRACKED_SENDERS {
            tracing::debug!(%from, "too many unregistered senders, not tracking");
            return;
        }
        let last = seen.entry(from).or_insert(0);
        *last = (*last).max(seqid);
    }

    /// Queues a payload for every registered peer. Returns the peer count.
    pub fn broadcast(&self, payload: &[u8], kind: u8, important: bool) -> usize {
        let peers = self.peers.read();
        for manager in peers.values() {
            manager.enqueue_send(payload, kind, important);
        }
        peers.len()
    }

    /// Drains every send queue into addressed datagrams.
    #[must_use]
    pub fn collect_outgoing(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        let mut out = Vec::new();

        for packet in self.global.drain_send() {
            if packet.header.endpoint.is_unspecified() {
                tracing::warn!(
                    seqid = packet.header.seqid,
                    kind = packet.header.kind,
                    "dropping unaddressed frame from global manager"
                );
                continue;
            }
            out.push((packet.header.endpoint.to_socket_addr(), serialize(&packet)));
        }

        for (&addr, manager) in self.peers.read().iter() {
            let endpoint = Endpoint::from(addr);
            for mut packet in manager.drain_send() {
                packet.header.endpoint = endpoint;
                out.push((addr, serialize(&packet)));
            }
        }

        out
    }

    /// Drives one I/O cycle for all peers over a shared socket.
    ///
    /// # Errors
    ///
    /// Returns a receive error other than "would block".
    pub fn pump<S: DatagramSocket>(&self, socket: &mut S) -> io::Result<PumpReport> {
        let mut report = read_phase(
            socket,
            self.config.max_datagram_size,
            self.config.max_reads_per_pump,
            |bytes, from| self.route(bytes, from).is_ok(),
        )?;

        for (addr, bytes) in self.collect_outgoing() {
            send_one(socket, &bytes, addr, &mut report);
        }

        Ok(report)
    }
}

impl Default for PeerTable {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

//! # Packet Dispatch
//!
//! Routes received packets to callbacks keyed by their kind byte.

use std::collections::HashMap;
use std::fmt;

use crate::protocol::Packet;

/// Callback invoked with a received packet.
pub type PacketCallback = Box<dyn FnMut(&Packet) + Send>;

/// Kind-indexed callback table.
#[derive(Default)]
pub struct PacketHandler {
    callbacks: HashMap<u8, PacketCallback>,
}

impl PacketHandler {
    /// Creates an empty handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `kind`, replacing any previous one.
    pub fn register<F>(&mut self, kind: impl Into<u8>, callback: F)
    where
        F: FnMut(&Packet) + Send + 'static,
    {
        self.callbacks.insert(kind.into(), Box::new(callback));
    }

    /// Removes the callback for `kind`.
    pub fn unregister(&mut self, kind: impl Into<u8>) {
        self.callbacks.remove(&kind.into());
    }

    /// Whether a callback is registered for `kind`.
    #[must_use]
    pub fn has_handler(&self, kind: impl Into<u8>) -> bool {
        self.callbacks.contains_key(&kind.into())
    }

    /// Removes every callback.
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    /// Runs the callback for this packet's kind. Returns false if none is registered.
    pub fn handle(&mut self, packet: &Packet) -> bool {
        match self.callbacks.get_mut(&packet.kind()) {
            Some(callback) => {
                callback(packet);
                true
            }
            None => {
                tracing::trace!(kind = packet.kind(), "no handler for packet kind");
                false
            }
        }
    }

    /// Handles packets in order. Returns how many had a callback.
    pub fn process(&mut self, packets: &[Packet]) -> usize {
        packets.iter().filter(|p| self.handle(p)).count()
    }
}

impl fmt::Debug for PacketHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<u8> = self.callbacks.keys().copied().collect();
        kinds.sort_unstable();
        f.debug_struct("PacketHandler").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[test]
    fn test_dispatch_by_kind() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut handler = PacketHandler::new();
        let sink = Arc::clone(&seen);
        handler.register(4u8, move |p: &Packet| sink.lock().push(p.payload().to_vec()));

        let packets = vec![
            Packet::data(4, b"a".to_vec()),
            Packet::data(5, b"b".to_vec()),
            Packet::data(4, b"c".to_vec()),
        ];
        assert_eq!(handler.process(&packets), 2);
        assert_eq!(*seen.lock(), vec![b"a".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_register_replaces() {
        let hits = Arc::new(Mutex::new(0u32));
        let mut handler = PacketHandler::new();
        handler.register(1u8, |_: &Packet| {});
        let counter = Arc::clone(&hits);
        handler.register(1u8, move |_: &Packet| *counter.lock() += 10);

        assert!(handler.handle(&Packet::data(1, Vec::new())));
        assert_eq!(*hits.lock(), 10);
    }

    #[test]
    fn test_unregister_and_clear() {
        let mut handler = PacketHandler::new();
        handler.register(1u8, |_: &Packet| {});
        handler.register(2u8, |_: &Packet| {});
        assert!(handler.has_handler(1u8));

        handler.unregister(1u8);
        assert!(!handler.has_handler(1u8));
        assert!(!handler.handle(&Packet::data(1, Vec::new())));

        handler.clear();
        assert!(!handler.has_handler(2u8));
        assert_eq!(format!("{handler:?}"), "PacketHandler { kinds: [] }");
    }
}

//! # Reliability Layer
//!
//! Selective reliability for "important" packets:
//!
//! - Sender side: monotonically assigned sequence numbers and a bounded
//!   history of sent packets ([`PacketHistory`]).
//! - Receiver side: gap detection that turns skipped sequence numbers into
//!   ack-requests ([`ReceiveSequencer`]).
//!
//! An ack-request names one missing sequence number; the peer answers by
//! replaying its stored copy. Delivery is best effort: a packet that has
//! left the sender's history is not recoverable.

mod history;
mod sequencer;

pub use history::{PacketHistory, PACKET_HISTORY_SIZE};
pub use sequencer::{Arrival, ReceiveSequencer};

//! # Transport Configuration
//!
//! Tunables for one [`PacketManager`](crate::PacketManager) and its I/O pump.
//! Loaded once at startup, either built in code or read from TOML:
//!
//! ```toml
//! compression = true
//! compression_threshold = 32
//! history_capacity = 512
//! max_datagram_size = 2048
//! max_reads_per_pump = 64
//! ```
//!
//! Missing keys fall back to [`TransportConfig::default`].

use std::path::Path;

use serde::Deserialize;

use crate::error::{TransportError, TransportResult};
use crate::protocol::{COMPRESSION_THRESHOLD, HEADER_SIZE};
use crate::reliability::PACKET_HISTORY_SIZE;

/// Default datagram buffer size for socket reads.
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 2048;

/// Default number of datagrams read per pump cycle.
pub const DEFAULT_MAX_READS_PER_PUMP: usize = 64;

/// Transport configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Initial state of the compression toggle.
    pub compression: bool,
    /// Payloads must be strictly larger than this to be compressed.
    pub compression_threshold: usize,
    /// Number of reliable packets kept for retransmission.
    ///
    /// Packets older than this many reliable sends can no longer be recovered.
    pub history_capacity: usize,
    /// Receive buffer size; longer datagrams are truncated by the socket.
    pub max_datagram_size: usize,
    /// Upper bound on datagrams ingested by a single pump cycle.
    pub max_reads_per_pump: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            compression: false,
            compression_threshold: COMPRESSION_THRESHOLD,
            history_capacity: PACKET_HISTORY_SIZE,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            max_reads_per_pump: DEFAULT_MAX_READS_PER_PUMP,
        }
    }
}

impl TransportConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidConfig`] on a parse error or bad value.
    pub fn from_toml_str(source: &str) -> TransportResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| TransportError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidConfig`], including when the file is unreadable.
    pub fn from_toml_file(path: impl AsRef<Path>) -> TransportResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            TransportError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`TransportError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> TransportResult<()> {
        if self.history_capacity == 0 {
            return Err(TransportError::InvalidConfig(
                "history_capacity must be at least 1".into(),
            ));
        }
        if self.max_datagram_size < HEADER_SIZE {
            return Err(TransportError::InvalidConfig(format!(
                "max_datagram_size must be at least {HEADER_SIZE}"
            )));
        }
        if self.max_reads_per_pump == 0 {
            return Err(TransportError::InvalidConfig(
                "max_reads_per_pump must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Returns a copy with the compression toggle set.
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Returns a copy with a different history capacity.
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}
